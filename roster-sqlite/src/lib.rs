//! roster-sqlite: SQLite storage for the Roster employee directory.

pub mod columns;
pub mod schema;
pub mod sql;
pub mod store;

pub use columns::SqliteColumnConfig;
pub use schema::migrate;
pub use sql::{SqlQuery, SqlTranslator, SqlValue};
pub use store::SqliteEmployeeStore;
