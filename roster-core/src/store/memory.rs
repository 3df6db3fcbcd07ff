use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{EmployeeStore, StoreError};
use crate::employee::Employee;
use crate::filters::{CompanyId, DepartmentId, PositionId, Status};
use crate::query::{Predicate, QueryPlan, TextTerm};
use crate::tenant::OrgId;

type Ids = BTreeSet<i64>;

/// Indexed in-process employee store.
///
/// Rows are partitioned by organization first. Inside a partition every
/// filter dimension has an inverted index, free text has a trigram index
/// (substring terms) and an ordered value index (prefix terms), so no plan
/// walks the whole partition unless it has no restriction at all.
#[derive(Debug, Default)]
pub struct MemoryEmployeeStore {
    orgs: RwLock<HashMap<OrgId, OrgPartition>>,
}

impl MemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees<I>(employees: I) -> Self
    where
        I: IntoIterator<Item = Employee>,
    {
        let store = Self::new();
        store.extend(employees);
        store
    }

    /// Insert or replace by `id`. A row re-inserted under another
    /// organization moves there.
    pub fn insert(&self, employee: Employee) {
        place(&mut self.orgs.write(), employee);
    }

    pub fn extend<I>(&self, employees: I)
    where
        I: IntoIterator<Item = Employee>,
    {
        let mut orgs = self.orgs.write();
        for employee in employees {
            place(&mut orgs, employee);
        }
    }

    pub fn len(&self) -> usize {
        self.orgs.read().values().map(|p| p.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EmployeeStore for MemoryEmployeeStore {
    async fn count(&self, plan: &QueryPlan) -> Result<u64, StoreError> {
        let orgs = self.orgs.read();
        Ok(orgs
            .get(plan.org_id())
            .map(|p| p.matching(plan).len() as u64)
            .unwrap_or(0))
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Employee>, StoreError> {
        let orgs = self.orgs.read();
        let Some(partition) = orgs.get(plan.org_id()) else {
            return Ok(Vec::new());
        };

        let offset = usize::try_from(plan.offset()).unwrap_or(usize::MAX);
        Ok(partition
            .matching(plan)
            .into_iter()
            .skip(offset)
            .take(plan.limit() as usize)
            .filter_map(|id| partition.rows.get(&id).cloned())
            .collect())
    }
}

fn place(orgs: &mut HashMap<OrgId, OrgPartition>, employee: Employee) {
    orgs.retain(|org, partition| {
        if *org != employee.org_id {
            partition.remove(employee.id);
        }
        !partition.rows.is_empty()
    });
    orgs.entry(employee.org_id.clone())
        .or_default()
        .insert(employee);
}

#[derive(Debug, Default)]
struct OrgPartition {
    rows: BTreeMap<i64, Employee>,
    by_status: HashMap<Status, Ids>,
    by_location: HashMap<String, Ids>,
    by_company: HashMap<CompanyId, Ids>,
    by_department: HashMap<DepartmentId, Ids>,
    by_position: HashMap<PositionId, Ids>,
    trigrams: HashMap<String, Ids>,
    /// Lowercased searchable values, ordered for prefix range scans.
    values: BTreeMap<String, Ids>,
}

impl OrgPartition {
    fn insert(&mut self, employee: Employee) {
        if let Some(old) = self.rows.remove(&employee.id) {
            self.unindex(&old);
        }
        self.index(&employee);
        self.rows.insert(employee.id, employee);
    }

    fn remove(&mut self, id: i64) {
        if let Some(old) = self.rows.remove(&id) {
            self.unindex(&old);
        }
    }

    fn index(&mut self, e: &Employee) {
        self.by_status.entry(e.status).or_default().insert(e.id);
        self.by_location
            .entry(e.location.to_lowercase())
            .or_default()
            .insert(e.id);
        self.by_company.entry(e.company_id).or_default().insert(e.id);
        self.by_department
            .entry(e.department_id)
            .or_default()
            .insert(e.id);
        self.by_position.entry(e.position_id).or_default().insert(e.id);

        for field in e.searchable_fields() {
            let value = field.to_lowercase();
            if value.is_empty() {
                continue;
            }
            for gram in trigrams(&value) {
                self.trigrams.entry(gram).or_default().insert(e.id);
            }
            self.values.entry(value).or_default().insert(e.id);
        }
    }

    fn unindex(&mut self, e: &Employee) {
        detach(&mut self.by_status, &e.status, e.id);
        detach(&mut self.by_location, &e.location.to_lowercase(), e.id);
        detach(&mut self.by_company, &e.company_id, e.id);
        detach(&mut self.by_department, &e.department_id, e.id);
        detach(&mut self.by_position, &e.position_id, e.id);

        for field in e.searchable_fields() {
            let value = field.to_lowercase();
            for gram in trigrams(&value) {
                detach(&mut self.trigrams, &gram, e.id);
            }
            if let Some(ids) = self.values.get_mut(&value) {
                ids.remove(&e.id);
                if ids.is_empty() {
                    self.values.remove(&value);
                }
            }
        }
    }

    /// Ids matching every predicate and term, ascending.
    fn matching(&self, plan: &QueryPlan) -> Ids {
        let mut candidates: Option<Ids> = None;

        for predicate in plan.predicates() {
            let ids = match predicate {
                Predicate::Status(values) => union(&self.by_status, values),
                Predicate::Location(values) => union(&self.by_location, values),
                Predicate::Company(values) => union(&self.by_company, values),
                Predicate::Department(values) => union(&self.by_department, values),
                Predicate::Position(values) => union(&self.by_position, values),
            };
            let narrowed = narrow(candidates, ids);
            if narrowed.is_empty() {
                return narrowed;
            }
            candidates = Some(narrowed);
        }

        for term in plan.terms() {
            let ids = match term {
                TextTerm::Substring(_) => self.substring_matches(term),
                TextTerm::Prefix(text) => self.prefix_matches(text),
            };
            let narrowed = narrow(candidates, ids);
            if narrowed.is_empty() {
                return narrowed;
            }
            candidates = Some(narrowed);
        }

        candidates.unwrap_or_else(|| self.rows.keys().copied().collect())
    }

    fn substring_matches(&self, term: &TextTerm) -> Ids {
        let mut hits: Option<Ids> = None;
        for gram in trigrams(term.text()) {
            match self.trigrams.get(&gram) {
                Some(ids) => hits = Some(narrow(hits, ids.clone())),
                None => return Ids::new(),
            }
        }

        // Every trigram present does not mean they are adjacent in one field.
        hits.unwrap_or_default()
            .into_iter()
            .filter(|id| {
                self.rows
                    .get(id)
                    .is_some_and(|e| e.searchable_fields().iter().any(|f| term.matches(f)))
            })
            .collect()
    }

    fn prefix_matches(&self, prefix: &str) -> Ids {
        self.values
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(value, _)| value.starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }
}

fn trigrams(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

fn union<'a, K, I>(index: &HashMap<K, Ids>, keys: I) -> Ids
where
    K: Hash + Eq + 'a,
    I: IntoIterator<Item = &'a K>,
{
    keys.into_iter()
        .filter_map(|k| index.get(k))
        .flat_map(|ids| ids.iter().copied())
        .collect()
}

fn narrow(current: Option<Ids>, ids: Ids) -> Ids {
    match current {
        None => ids,
        Some(prev) => prev.intersection(&ids).copied().collect(),
    }
}

fn detach<K: Hash + Eq>(index: &mut HashMap<K, Ids>, key: &K, id: i64) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}
