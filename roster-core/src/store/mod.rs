//! The storage collaborator seam.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryEmployeeStore;

use crate::employee::Employee;
use crate::query::QueryPlan;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage could not be reached. Worth retrying.
    #[error("employee store unavailable: {0}")]
    Unavailable(#[source] BoxError),

    #[error("employee query failed: {0}")]
    Query(#[source] BoxError),
}

impl StoreError {
    pub fn unavailable(err: impl Into<BoxError>) -> Self {
        StoreError::Unavailable(err.into())
    }

    pub fn query(err: impl Into<BoxError>) -> Self {
        StoreError::Query(err.into())
    }
}

/// Read-only employee storage.
///
/// Implementations apply `plan.org_id()` before any other predicate, order
/// rows by id ascending, and only ever return committed rows. `count`
/// ignores the page window; `fetch` honours it.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn count(&self, plan: &QueryPlan) -> Result<u64, StoreError>;

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Employee>, StoreError>;
}
