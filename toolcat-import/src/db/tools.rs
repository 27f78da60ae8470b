//! SQLite-backed tool catalog

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::services::{NewTool, StoreError, StoredTool, ToolFilter, ToolStore, ToolUpdate};
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

pub struct SqliteToolStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteToolStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }
}

fn row_to_tool(row: &SqliteRow) -> Result<StoredTool, StoreError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| StoreError::Backend(format!("Invalid tool id {}: {}", id, e)))?;
    let summary: String = row.get("summary");

    Ok(StoredTool {
        id,
        name: row.get("name"),
        link: row.get("link"),
        category: row.get("category"),
        source: row.get("source"),
        brand: row.get("brand"),
        summary: serde_json::from_str(&summary)?,
        deleted: row.get("deleted"),
    })
}

#[async_trait]
impl ToolStore for SqliteToolStore {
    async fn query(&self, filter: &ToolFilter) -> Result<Vec<StoredTool>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, name, link, category, source, brand, summary, deleted FROM tools WHERE 1 = 1",
        );
        if let Some(name) = &filter.name {
            builder.push(" AND name = ").push_bind(name.clone());
        }
        if let Some(link) = &filter.link {
            builder.push(" AND link = ").push_bind(link.clone());
        }
        if let Some(deleted) = filter.deleted {
            builder.push(" AND deleted = ").push_bind(deleted);
        }
        builder.push(" ORDER BY created_at, rowid");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_tool).collect()
    }

    async fn create(&self, tool: NewTool) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let summary = serde_json::to_string(&tool.summary)?;
        let now = Utc::now().to_rfc3339();
        let (id_str, summary, now) = (id_str.as_str(), summary.as_str(), now.as_str());
        let pool = &self.pool;
        let tool = &tool;

        retry_on_lock("create_tool", self.max_lock_wait_ms, move || async move {
            sqlx::query(
                r#"
                INSERT INTO tools (
                    id, name, link, category, source, brand, summary, deleted,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id_str)
            .bind(tool.name.as_str())
            .bind(tool.link.as_str())
            .bind(tool.category.as_str())
            .bind(tool.source.as_str())
            .bind(tool.brand.as_str())
            .bind(summary)
            .bind(tool.deleted)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
        })
        .await?;

        tracing::debug!(%id, name = %tool.name, link = %tool.link, "Tool created");
        Ok(id)
    }

    async fn update(&self, id: Uuid, update: ToolUpdate) -> Result<(), StoreError> {
        let id_str = id.to_string();
        let summary = update
            .summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now().to_rfc3339();
        let (id_str, summary, now) = (id_str.as_str(), summary.as_deref(), now.as_str());
        let pool = &self.pool;
        let update = &update;

        let result = retry_on_lock("update_tool", self.max_lock_wait_ms, move || async move {
            sqlx::query(
                r#"
                UPDATE tools SET
                    name = COALESCE(?, name),
                    link = COALESCE(?, link),
                    category = COALESCE(?, category),
                    source = COALESCE(?, source),
                    brand = COALESCE(?, brand),
                    summary = COALESCE(?, summary),
                    deleted = COALESCE(?, deleted),
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(update.name.as_deref())
            .bind(update.link.as_deref())
            .bind(update.category.as_deref())
            .bind(update.source.as_deref())
            .bind(update.brand.as_deref())
            .bind(summary)
            .bind(update.deleted)
            .bind(now)
            .bind(id_str)
            .execute(pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
