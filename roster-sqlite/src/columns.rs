use async_trait::async_trait;
use roster_core::{ColumnConfigSource, OrgId};
use sqlx::{Row, SqlitePool};

/// Column configuration rows from `column_configurations`.
///
/// An organization with no rows has no configuration. Hidden rows
/// (`is_visible = 0`) are left out; order is `display_order`.
#[derive(Debug, Clone)]
pub struct SqliteColumnConfig {
    pool: SqlitePool,
}

impl SqliteColumnConfig {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace `org_id`'s configuration with `columns`, in order, all visible.
    pub async fn set_column_config(&self, org_id: &OrgId, columns: &[&str]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO organizations (id) VALUES (?)")
            .bind(org_id.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM column_configurations WHERE org_id = ?")
            .bind(org_id.as_str())
            .execute(&mut *tx)
            .await?;
        for (order, column) in columns.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO column_configurations (org_id, column_name, is_visible, display_order) \
                 VALUES (?, ?, 1, ?)",
            )
            .bind(org_id.as_str())
            .bind(*column)
            .bind(order as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ColumnConfigSource for SqliteColumnConfig {
    async fn get_column_config(&self, org_id: &OrgId) -> anyhow::Result<Option<Vec<String>>> {
        let rows = sqlx::query(
            "SELECT column_name, is_visible FROM column_configurations \
             WHERE org_id = ? ORDER BY display_order, id",
        )
        .bind(org_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let visible: bool = row.try_get("is_visible")?;
            if visible {
                columns.push(row.try_get::<String, _>("column_name")?);
            }
        }
        Ok(Some(columns))
    }
}
