//! Per-organization output columns.
//!
//! What a response may show is the intersection of a fixed allow-list
//! ([`ColumnName`]) and the organization's configured list. Anything outside
//! the allow-list is dropped, whatever the configuration says.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::warn;

use crate::employee::Employee;
use crate::tenant::OrgId;

/// The allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnName {
    Id,
    Name,
    FirstName,
    LastName,
    Email,
    Phone,
    Location,
    Status,
    Company,
    Department,
    Position,
}

/// Used when an organization has no usable configuration.
pub const DEFAULT_COLUMNS: [ColumnName; 8] = [
    ColumnName::FirstName,
    ColumnName::LastName,
    ColumnName::Email,
    ColumnName::Department,
    ColumnName::Position,
    ColumnName::Location,
    ColumnName::Phone,
    ColumnName::Status,
];

impl ColumnName {
    pub const ALL: [ColumnName; 11] = [
        ColumnName::Id,
        ColumnName::Name,
        ColumnName::FirstName,
        ColumnName::LastName,
        ColumnName::Email,
        ColumnName::Phone,
        ColumnName::Location,
        ColumnName::Status,
        ColumnName::Company,
        ColumnName::Department,
        ColumnName::Position,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnName::Id => "id",
            ColumnName::Name => "name",
            ColumnName::FirstName => "first_name",
            ColumnName::LastName => "last_name",
            ColumnName::Email => "email",
            ColumnName::Phone => "phone",
            ColumnName::Location => "location",
            ColumnName::Status => "status",
            ColumnName::Company => "company",
            ColumnName::Department => "department",
            ColumnName::Position => "position",
        }
    }

    /// `None` for anything not on the allow-list.
    pub fn parse(raw: &str) -> Option<ColumnName> {
        let raw = raw.trim();
        ColumnName::ALL.into_iter().find(|c| c.as_str() == raw)
    }

    /// The value this column shows for `employee`.
    pub fn project(&self, employee: &Employee) -> Value {
        match self {
            ColumnName::Id => json!(employee.id),
            ColumnName::Name => json!(employee.full_name()),
            ColumnName::FirstName => json!(employee.first_name),
            ColumnName::LastName => json!(employee.last_name),
            ColumnName::Email => json!(employee.email),
            ColumnName::Phone => json!(employee.phone),
            ColumnName::Location => json!(employee.location),
            ColumnName::Status => json!(employee.status.as_str()),
            ColumnName::Company => json!(employee.company),
            ColumnName::Department => json!(employee.department),
            ColumnName::Position => json!(employee.position),
        }
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where per-organization column lists come from.
///
/// `Ok(None)` means the organization has no configuration.
#[async_trait]
pub trait ColumnConfigSource: Send + Sync {
    async fn get_column_config(&self, org_id: &OrgId) -> anyhow::Result<Option<Vec<String>>>;
}

/// In-process column configuration.
///
/// Updates swap a whole list, so readers never see a half-written one.
#[derive(Debug, Default)]
pub struct MemoryColumnConfig {
    configs: RwLock<HashMap<OrgId, Arc<Vec<String>>>>,
}

impl MemoryColumnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<I, S>(&self, org_id: OrgId, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.configs.write().insert(org_id, Arc::new(list));
    }

    pub fn remove(&self, org_id: &OrgId) -> bool {
        self.configs.write().remove(org_id).is_some()
    }
}

#[async_trait]
impl ColumnConfigSource for MemoryColumnConfig {
    async fn get_column_config(&self, org_id: &OrgId) -> anyhow::Result<Option<Vec<String>>> {
        let list = self.configs.read().get(org_id).cloned();
        Ok(list.map(|l| l.as_ref().clone()))
    }
}

/// Turns an organization into its ordered output columns.
#[derive(Clone)]
pub struct ColumnResolver {
    source: Arc<dyn ColumnConfigSource>,
}

impl ColumnResolver {
    pub fn new(source: Arc<dyn ColumnConfigSource>) -> Self {
        Self { source }
    }

    /// Never fails. Lookup errors and empty results fall back to
    /// [`DEFAULT_COLUMNS`].
    pub async fn resolve(&self, org_id: &OrgId) -> Vec<ColumnName> {
        let configured = match self.source.get_column_config(org_id).await {
            Ok(Some(list)) => list,
            Ok(None) => return DEFAULT_COLUMNS.to_vec(),
            Err(err) => {
                warn!(org_id = %org_id, error = %err, "column configuration lookup failed; using default columns");
                return DEFAULT_COLUMNS.to_vec();
            }
        };

        let columns = allowed_columns(org_id, &configured);
        if columns.is_empty() {
            warn!(org_id = %org_id, "column configuration has no allowed columns; using default columns");
            return DEFAULT_COLUMNS.to_vec();
        }
        columns
    }
}

/// Allow-listed names in configured order, first occurrence wins.
pub fn allowed_columns(org_id: &OrgId, configured: &[String]) -> Vec<ColumnName> {
    let mut out: Vec<ColumnName> = Vec::with_capacity(configured.len());
    for raw in configured {
        match ColumnName::parse(raw) {
            Some(col) if !out.contains(&col) => out.push(col),
            Some(_) => {}
            None => warn!(org_id = %org_id, column = %raw, "dropping column not on the allow-list"),
        }
    }
    out
}

/// Shape one employee to `columns`, in order.
pub fn project_row(employee: &Employee, columns: &[ColumnName]) -> serde_json::Map<String, Value> {
    columns
        .iter()
        .map(|c| (c.as_str().to_string(), c.project(employee)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl ColumnConfigSource for FailingSource {
        async fn get_column_config(&self, _: &OrgId) -> anyhow::Result<Option<Vec<String>>> {
            Err(anyhow::anyhow!("config store offline"))
        }
    }

    fn resolver_with(org: &str, cols: &[&str]) -> ColumnResolver {
        let source = MemoryColumnConfig::new();
        source.set(OrgId::new(org), cols.iter().copied());
        ColumnResolver::new(Arc::new(source))
    }

    #[tokio::test]
    async fn configured_order_is_kept() {
        let resolver = resolver_with("acme", &["name", "department"]);
        let cols = resolver.resolve(&OrgId::new("acme")).await;
        assert_eq!(cols, vec![ColumnName::Name, ColumnName::Department]);
    }

    #[tokio::test]
    async fn unknown_and_restricted_names_are_dropped() {
        let resolver = resolver_with("acme", &["salary", "email", "national_id", "email", "id"]);
        let cols = resolver.resolve(&OrgId::new("acme")).await;
        assert_eq!(cols, vec![ColumnName::Email, ColumnName::Id]);
    }

    #[tokio::test]
    async fn missing_configuration_uses_defaults() {
        let resolver = resolver_with("acme", &["name"]);
        let cols = resolver.resolve(&OrgId::new("globex")).await;
        assert_eq!(cols, DEFAULT_COLUMNS.to_vec());
    }

    #[tokio::test]
    async fn nothing_allowed_uses_defaults() {
        let resolver = resolver_with("acme", &["salary", "ssn"]);
        let cols = resolver.resolve(&OrgId::new("acme")).await;
        assert_eq!(cols, DEFAULT_COLUMNS.to_vec());
    }

    #[tokio::test]
    async fn lookup_failure_uses_defaults() {
        let resolver = ColumnResolver::new(Arc::new(FailingSource));
        let cols = resolver.resolve(&OrgId::new("acme")).await;
        assert_eq!(cols, DEFAULT_COLUMNS.to_vec());
    }

    #[tokio::test]
    async fn removing_a_configuration_restores_defaults() {
        let source = Arc::new(MemoryColumnConfig::new());
        let acme = OrgId::new("acme");
        source.set(acme.clone(), ["id"]);
        let resolver = ColumnResolver::new(source.clone());
        assert_eq!(resolver.resolve(&acme).await, vec![ColumnName::Id]);

        assert!(source.remove(&acme));
        assert_eq!(resolver.resolve(&acme).await, DEFAULT_COLUMNS.to_vec());
    }
}
