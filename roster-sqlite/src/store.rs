use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use roster_core::{
    CompanyId, DepartmentId, Employee, EmployeeStore, OrgId, PositionId, QueryPlan, Status,
    StoreError,
};
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{query::Query, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::schema;
use crate::sql::{SqlQuery, SqlTranslator, SqlValue};

/// [`EmployeeStore`] over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteEmployeeStore {
    pool: SqlitePool,
    translator: SqlTranslator,
}

impl SqliteEmployeeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            translator: SqlTranslator,
        }
    }

    /// Open (creating if missing) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Each connection to an in-memory database is its own database.
        let max_connections = if url.contains(":memory:") { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        schema::migrate(&pool).await?;
        info!(url, "sqlite employee store connected");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace one employee, with its organization and lookups,
    /// in a single transaction.
    pub async fn insert_employee(&self, e: &Employee) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO organizations (id) VALUES (?)")
            .bind(e.org_id.as_str())
            .execute(&mut *tx)
            .await?;
        upsert_lookup(&mut *tx, "companies", "name", e.company_id.0, &e.org_id, &e.company).await?;
        upsert_lookup(&mut *tx, "departments", "name", e.department_id.0, &e.org_id, &e.department)
            .await?;
        upsert_lookup(&mut *tx, "positions", "title", e.position_id.0, &e.org_id, &e.position).await?;

        sqlx::query(
            "INSERT INTO employees \
             (id, org_id, company_id, department_id, position_id, first_name, last_name, email, phone, location, status, attributes) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
             org_id = excluded.org_id, company_id = excluded.company_id, \
             department_id = excluded.department_id, position_id = excluded.position_id, \
             first_name = excluded.first_name, last_name = excluded.last_name, \
             email = excluded.email, phone = excluded.phone, location = excluded.location, \
             status = excluded.status, attributes = excluded.attributes",
        )
        .bind(e.id)
        .bind(e.org_id.as_str())
        .bind(e.company_id.0)
        .bind(e.department_id.0)
        .bind(e.position_id.0)
        .bind(&e.first_name)
        .bind(&e.last_name)
        .bind(&e.email)
        .bind(e.phone.as_deref())
        .bind(&e.location)
        .bind(e.status.as_str())
        .bind(serde_json::to_string(&e.attributes)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Lookup ids are global, so a row owned by another organization is left
/// alone and the insert fails.
async fn upsert_lookup(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    id: i64,
    org: &OrgId,
    value: &str,
) -> anyhow::Result<()> {
    let sql = format!(
        "INSERT INTO {table} (id, org_id, {column}) VALUES (?, ?, ?) \
         ON CONFLICT (id) DO UPDATE SET {column} = excluded.{column} \
         WHERE {table}.org_id = excluded.org_id"
    );
    let done = sqlx::query(&sql)
        .bind(id)
        .bind(org.as_str())
        .bind(value)
        .execute(&mut *conn)
        .await?;
    if done.rows_affected() == 0 {
        anyhow::bail!("{table} id {id} belongs to another organization than '{org}'");
    }
    Ok(())
}

fn bind_all<'q>(sql: &'q SqlQuery) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    sql.binds
        .iter()
        .fold(sqlx::query(&sql.sql), |q, value| match value {
            SqlValue::Int(i) => q.bind(*i),
            SqlValue::Text(s) => q.bind(s.as_str()),
        })
}

fn store_error(err: sqlx::Error) -> StoreError {
    let transient = match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_transient_code(&code)),
        _ => false,
    };
    if transient {
        StoreError::unavailable(err)
    } else {
        StoreError::query(err)
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes,
/// clear once the competing writer finishes.
fn is_transient_code(code: &str) -> bool {
    code.parse::<i32>()
        .is_ok_and(|code| matches!(code & 0xff, 5 | 6))
}

fn employee_from_row(row: &SqliteRow) -> Result<Employee, StoreError> {
    let status: String = row.try_get("status").map_err(StoreError::query)?;
    let status = Status::parse(&status)
        .ok_or_else(|| StoreError::query(format!("unknown status '{status}' in storage")))?;

    let attributes: String = row.try_get("attributes").map_err(StoreError::query)?;
    let attributes: BTreeMap<String, Value> =
        serde_json::from_str(&attributes).map_err(StoreError::query)?;

    let org_id: String = row.try_get("org_id").map_err(StoreError::query)?;

    Ok(Employee {
        id: row.try_get("id").map_err(StoreError::query)?,
        org_id: OrgId::new(org_id),
        company_id: CompanyId(row.try_get("company_id").map_err(StoreError::query)?),
        company: row.try_get("company").map_err(StoreError::query)?,
        department_id: DepartmentId(row.try_get("department_id").map_err(StoreError::query)?),
        department: row.try_get("department").map_err(StoreError::query)?,
        position_id: PositionId(row.try_get("position_id").map_err(StoreError::query)?),
        position: row.try_get("position").map_err(StoreError::query)?,
        first_name: row.try_get("first_name").map_err(StoreError::query)?,
        last_name: row.try_get("last_name").map_err(StoreError::query)?,
        email: row.try_get("email").map_err(StoreError::query)?,
        phone: row.try_get("phone").map_err(StoreError::query)?,
        location: row.try_get("location").map_err(StoreError::query)?,
        status,
        attributes,
    })
}

#[async_trait]
impl EmployeeStore for SqliteEmployeeStore {
    async fn count(&self, plan: &QueryPlan) -> Result<u64, StoreError> {
        let sql = self.translator.count(plan);
        let row = bind_all(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        let count: i64 = row.try_get(0).map_err(StoreError::query)?;
        Ok(count.max(0) as u64)
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Employee>, StoreError> {
        let sql = self.translator.page(plan);
        let rows = bind_all(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        rows.iter().map(employee_from_row).collect()
    }
}
