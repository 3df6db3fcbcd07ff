//! roster-core: framework-agnostic core of the Roster employee directory.
//!
//! Admission control, filter validation, column resolution and the
//! tenant-scoped search engine. Transports (see `roster-axum`) and storage
//! adapters (see `roster-sqlite`) plug in through the traits re-exported here.

pub mod columns;
pub mod config;
pub mod directory;
pub mod employee;
pub mod engine;
pub mod errors;
pub mod filters;
pub mod query;
pub mod rate_limit;
pub mod store;
pub mod tenant;

pub use columns::{ColumnConfigSource, ColumnName, ColumnResolver, MemoryColumnConfig, DEFAULT_COLUMNS};
pub use config::{LimiterSettings, RosterConfig, RosterConfigSnapshot, SearchSettings, ENV_PREFIX};
pub use directory::EmployeeDirectory;
pub use employee::Employee;
pub use engine::{SearchEngine, SearchPage};
pub use errors::{ErrorKind, RosterError, RosterResult};
pub use filters::{
    CompanyId, DepartmentId, FilterSet, FilterValidator, PositionId, RawParams, Status,
    ValidationError,
};
pub use query::{Predicate, QueryPlan, TextTerm};
pub use rate_limit::{
    Admission, BucketStore, Clock, LimiterPolicy, ManualClock, MemoryBucketStore, MonotonicClock,
    PolicyError, RateLimiter,
};
pub use store::{EmployeeStore, MemoryEmployeeStore, StoreError};
pub use tenant::{ClientId, OrgId, TenantContext};
