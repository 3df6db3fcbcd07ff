use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, instrument};

use crate::columns::{project_row, ColumnName};
use crate::errors::{RosterError, RosterResult};
use crate::filters::FilterSet;
use crate::query::QueryPlan;
use crate::store::{EmployeeStore, StoreError};
use crate::tenant::OrgId;

/// One page of projected rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub data: Vec<Map<String, Value>>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

/// Runs tenant-scoped searches against an [`EmployeeStore`].
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn EmployeeStore>,
    timeout: Duration,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn EmployeeStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Count and page run concurrently under one deadline. Every row is
    /// checked against `org_id` before it is projected.
    #[instrument(
        name = "search",
        skip_all,
        fields(org_id = %org_id, page = filters.page, page_size = filters.page_size)
    )]
    pub async fn search(
        &self,
        org_id: &OrgId,
        filters: &FilterSet,
        columns: &[ColumnName],
    ) -> RosterResult<SearchPage> {
        let plan = QueryPlan::new(org_id.clone(), filters);
        debug!(
            predicates = plan.predicates().len(),
            terms = plan.terms().len(),
            offset = plan.offset(),
            "query plan built"
        );

        let work = async { tokio::try_join!(self.store.count(&plan), self.store.fetch(&plan)) };
        let (total_count, rows) = match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => return Err(storage_failure(err)),
            Err(_) => {
                error!(timeout_ms = self.timeout.as_millis() as u64, "search timed out");
                return Err(RosterError::storage_timeout(self.timeout));
            }
        };

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            if &row.org_id != org_id {
                // The row's id and owner stay out of the log as well.
                error!("store returned a row outside the requesting organization");
                return Err(RosterError::tenant_violation());
            }
            data.push(project_row(row, columns));
        }

        Ok(SearchPage {
            data,
            page: plan.page(),
            page_size: plan.page_size(),
            total_count,
        })
    }
}

fn storage_failure(err: StoreError) -> RosterError {
    error!(error = %err, "employee store failed");
    match err {
        StoreError::Unavailable(_) => RosterError::storage_unavailable(err.into()),
        StoreError::Query(_) => RosterError::internal("Internal server error").with_source(err.into()),
    }
}
