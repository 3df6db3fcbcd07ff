//! Directory schema.
//!
//! Every table carries `org_id`, and every index on `employees` leads with
//! it, so each query is an index range inside one organization. The
//! prefix-searched columns are declared NOCASE so their indexes serve
//! case-insensitive range scans. Free text
//! goes through `employees_fts`, an external-content FTS5 table with the
//! `trigram` tokenizer kept in sync by triggers.

use sqlx::SqlitePool;
use tracing::info;

pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS organizations (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS companies (
        id INTEGER PRIMARY KEY,
        org_id TEXT NOT NULL REFERENCES organizations (id),
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS departments (
        id INTEGER PRIMARY KEY,
        org_id TEXT NOT NULL REFERENCES organizations (id),
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS positions (
        id INTEGER PRIMARY KEY,
        org_id TEXT NOT NULL REFERENCES organizations (id),
        title TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id INTEGER PRIMARY KEY,
        org_id TEXT NOT NULL REFERENCES organizations (id),
        company_id INTEGER NOT NULL REFERENCES companies (id),
        department_id INTEGER NOT NULL REFERENCES departments (id),
        position_id INTEGER NOT NULL REFERENCES positions (id),
        first_name TEXT NOT NULL COLLATE NOCASE,
        last_name TEXT NOT NULL COLLATE NOCASE,
        email TEXT NOT NULL COLLATE NOCASE,
        phone TEXT COLLATE NOCASE,
        location TEXT NOT NULL COLLATE NOCASE,
        status TEXT NOT NULL DEFAULT 'Active',
        attributes TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS column_configurations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        org_id TEXT NOT NULL REFERENCES organizations (id),
        column_name TEXT NOT NULL,
        is_visible INTEGER NOT NULL DEFAULT 1,
        display_order INTEGER NOT NULL DEFAULT 0,
        UNIQUE (org_id, column_name)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_employees_org_id ON employees (org_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_org_status ON employees (org_id, status, id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_org_location ON employees (org_id, location, id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_org_company ON employees (org_id, company_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_org_department ON employees (org_id, department_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_org_position ON employees (org_id, position_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_first_name_nc ON employees (org_id, first_name)",
    "CREATE INDEX IF NOT EXISTS idx_employees_last_name_nc ON employees (org_id, last_name)",
    "CREATE INDEX IF NOT EXISTS idx_employees_email_nc ON employees (org_id, email)",
    "CREATE INDEX IF NOT EXISTS idx_employees_phone_nc ON employees (org_id, phone)",
    r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS employees_fts USING fts5(
        first_name, last_name, email, phone,
        content = 'employees',
        content_rowid = 'id',
        tokenize = 'trigram'
    )
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS employees_fts_insert AFTER INSERT ON employees BEGIN
        INSERT INTO employees_fts (rowid, first_name, last_name, email, phone)
        VALUES (new.id, new.first_name, new.last_name, new.email, new.phone);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS employees_fts_delete AFTER DELETE ON employees BEGIN
        INSERT INTO employees_fts (employees_fts, rowid, first_name, last_name, email, phone)
        VALUES ('delete', old.id, old.first_name, old.last_name, old.email, old.phone);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS employees_fts_update AFTER UPDATE ON employees BEGIN
        INSERT INTO employees_fts (employees_fts, rowid, first_name, last_name, email, phone)
        VALUES ('delete', old.id, old.first_name, old.last_name, old.email, old.phone);
        INSERT INTO employees_fts (rowid, first_name, last_name, email, phone)
        VALUES (new.id, new.first_name, new.last_name, new.email, new.phone);
    END
    "#,
];

/// Create tables, indexes and triggers that do not exist yet.
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(statements = SCHEMA.len(), "directory schema ready");
    Ok(())
}
