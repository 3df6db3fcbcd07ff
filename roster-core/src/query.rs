//! Storage-agnostic description of one search.
//!
//! A [`QueryPlan`] can only be built from an [`OrgId`] and a validated
//! [`FilterSet`]. The organization is its root: stores apply it before any
//! other predicate, and there is no way to build a plan without one.

use std::collections::BTreeSet;

use crate::filters::{CompanyId, DepartmentId, FilterSet, PositionId, Status};
use crate::tenant::OrgId;

/// Terms at least this long match as substrings, shorter ones as prefixes.
pub const TRIGRAM_MIN_CHARS: usize = 3;

/// One `IN set` restriction on a single dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Status(BTreeSet<Status>),
    /// Lowercased; matched case-insensitively.
    Location(BTreeSet<String>),
    Company(BTreeSet<CompanyId>),
    Department(BTreeSet<DepartmentId>),
    Position(BTreeSet<PositionId>),
}

impl Predicate {
    /// Number of values OR-ed together.
    pub fn len(&self) -> usize {
        match self {
            Predicate::Status(s) => s.len(),
            Predicate::Location(s) => s.len(),
            Predicate::Company(s) => s.len(),
            Predicate::Department(s) => s.len(),
            Predicate::Position(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One lowercased free-text term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextTerm {
    Substring(String),
    Prefix(String),
}

impl TextTerm {
    pub fn from_word(word: &str) -> Self {
        let word = word.to_lowercase();
        if word.chars().count() >= TRIGRAM_MIN_CHARS {
            TextTerm::Substring(word)
        } else {
            TextTerm::Prefix(word)
        }
    }

    pub fn text(&self) -> &str {
        match self {
            TextTerm::Substring(t) | TextTerm::Prefix(t) => t,
        }
    }

    /// Whether `field` satisfies this term. `field` need not be lowercased.
    pub fn matches(&self, field: &str) -> bool {
        let field = field.to_lowercase();
        match self {
            TextTerm::Substring(t) => field.contains(t.as_str()),
            TextTerm::Prefix(t) => field.starts_with(t.as_str()),
        }
    }
}

/// Tenant-rooted search: predicates AND-ed, text terms AND-ed, rows ordered
/// by id ascending, one page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    org_id: OrgId,
    predicates: Vec<Predicate>,
    terms: Vec<TextTerm>,
    page: u32,
    page_size: u32,
}

impl QueryPlan {
    pub fn new(org_id: OrgId, filters: &FilterSet) -> Self {
        let candidates = [
            Predicate::Status(filters.statuses.clone()),
            Predicate::Location(filters.locations.clone()),
            Predicate::Company(filters.companies.clone()),
            Predicate::Department(filters.departments.clone()),
            Predicate::Position(filters.positions.clone()),
        ];
        let predicates = candidates.into_iter().filter(|p| !p.is_empty()).collect();

        let terms = filters
            .free_text
            .as_deref()
            .map(|text| text.split_whitespace().map(TextTerm::from_word).collect())
            .unwrap_or_default();

        Self {
            org_id,
            predicates,
            terms,
            page: filters.page,
            page_size: filters.page_size,
        }
    }

    pub fn org_id(&self) -> &OrgId {
        &self.org_id
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn terms(&self) -> &[TextTerm] {
        &self.terms
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.page_size as u64
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dimensions_are_omitted() {
        let mut filters = FilterSet::default();
        filters.statuses.insert(Status::Active);
        let plan = QueryPlan::new(OrgId::new("acme"), &filters);

        assert_eq!(plan.org_id(), &OrgId::new("acme"));
        assert_eq!(
            plan.predicates(),
            &[Predicate::Status(BTreeSet::from([Status::Active]))]
        );
        assert!(plan.terms().is_empty());
    }

    #[test]
    fn free_text_splits_into_substring_and_prefix_terms() {
        let filters = FilterSet {
            free_text: Some("Jo Smith".into()),
            ..FilterSet::default()
        };
        let plan = QueryPlan::new(OrgId::new("acme"), &filters);
        assert_eq!(
            plan.terms(),
            &[
                TextTerm::Prefix("jo".into()),
                TextTerm::Substring("smith".into())
            ]
        );
    }

    #[test]
    fn terms_match_case_insensitively() {
        assert!(TextTerm::from_word("MIT").matches("Goldsmith"));
        assert!(TextTerm::from_word("gO").matches("Gordon"));
        assert!(!TextTerm::from_word("do").matches("Gordon"));
    }

    #[test]
    fn page_window() {
        let filters = FilterSet {
            page: 4,
            page_size: 25,
            ..FilterSet::default()
        };
        let plan = QueryPlan::new(OrgId::new("acme"), &filters);
        assert_eq!(plan.offset(), 75);
        assert_eq!(plan.limit(), 25);
    }
}
