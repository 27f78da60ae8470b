//! Import run history

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use toolcat_common::{Error, Result};
use uuid::Uuid;

use crate::models::{ImportRun, ImportStatus, RunKind};
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

/// Insert or update a run
pub async fn save_run(pool: &SqlitePool, run: &ImportRun) -> Result<()> {
    let run_id = run.run_id.to_string();
    let parent_run_id = run.parent_run_id.map(|id| id.to_string());
    let status = serde_json::to_string(&run.status)
        .map_err(|e| Error::Internal(format!("Failed to serialize status: {}", e)))?;
    let started_at = run.started_at.to_rfc3339();
    let ended_at = run.ended_at.map(|dt| dt.to_rfc3339());

    let (run_id, parent_run_id, status, started_at, ended_at) = (
        run_id.as_str(),
        parent_run_id.as_deref(),
        status.as_str(),
        started_at.as_str(),
        ended_at.as_deref(),
    );
    let kind = run.kind.as_str();
    let cancelled = run.cancelled;

    retry_on_lock("save_run", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
        sqlx::query(
            r#"
            INSERT INTO import_runs (
                run_id, kind, parent_run_id, status, cancelled, started_at, ended_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(run_id) DO UPDATE SET
                status = excluded.status,
                cancelled = excluded.cancelled,
                ended_at = excluded.ended_at
            "#,
        )
        .bind(run_id)
        .bind(kind)
        .bind(parent_run_id)
        .bind(status)
        .bind(cancelled)
        .bind(started_at)
        .bind(ended_at)
        .execute(pool)
        .await
    })
    .await?;

    Ok(())
}

/// Load a run by id
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<ImportRun>> {
    let row = sqlx::query(
        r#"
        SELECT run_id, kind, parent_run_id, status, cancelled, started_at, ended_at
        FROM import_runs
        WHERE run_id = ?
        "#,
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let kind: String = row.get("kind");
    let kind = RunKind::parse(&kind)
        .ok_or_else(|| Error::Internal(format!("Unknown run kind: {}", kind)))?;

    let parent_run_id: Option<String> = row.get("parent_run_id");
    let parent_run_id = parent_run_id
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse parent_run_id: {}", e)))?;

    let status: String = row.get("status");
    let status: ImportStatus = serde_json::from_str(&status)
        .map_err(|e| Error::Internal(format!("Failed to deserialize status: {}", e)))?;

    let started_at: String = row.get("started_at");
    let started_at = parse_timestamp(&started_at)?;
    let ended_at: Option<String> = row.get("ended_at");
    let ended_at = ended_at.as_deref().map(parse_timestamp).transpose()?;

    Ok(Some(ImportRun {
        run_id,
        kind,
        parent_run_id,
        status,
        cancelled: row.get("cancelled"),
        started_at,
        ended_at,
    }))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp {}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;
    use crate::models::{ImportError, ImportFailure, RawRecord};

    #[tokio::test]
    async fn test_save_and_load_run() {
        let pool = init_memory_pool().await.unwrap();
        let parent = Uuid::new_v4();
        let mut run = ImportRun::new(RunKind::Retry, Some(parent));
        save_run(&pool, &run).await.unwrap();

        let record = RawRecord::new("Cline", "https://cline.bot");
        run.status = ImportStatus {
            total: 1,
            processed: 1,
            successful: 0,
            failed: vec![ImportError::new(record, 0, ImportFailure::EnrichmentFailed("503".into()))],
            is_running: false,
            current_record: None,
        };
        run.ended_at = Some(Utc::now());
        save_run(&pool, &run).await.unwrap();

        let loaded = load_run(&pool, run.run_id).await.unwrap().unwrap();
        assert_eq!(loaded.kind, RunKind::Retry);
        assert_eq!(loaded.parent_run_id, Some(parent));
        assert_eq!(loaded.status, run.status);
        assert!(loaded.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_load_unknown_run() {
        let pool = init_memory_pool().await.unwrap();
        assert!(load_run(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
