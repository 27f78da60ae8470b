//! Import run API handlers
//!
//! POST /import/batch, POST /import/retry/{run_id}, GET /import/status/{run_id},
//! POST /import/cancel/{run_id}
//!
//! At most one run is active at a time. Runs execute on a background task;
//! their final status is persisted in `import_runs` before the run leaves the
//! active registry.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use toolcat_common::events::CatalogEvent;
use uuid::Uuid;

use crate::db::import_runs::{load_run, save_run};
use crate::error::{ApiError, ApiResult};
use crate::models::{ImportError, ImportRun, ImportStatus, RawRecord, RunKind};
use crate::services::{BatchError, EventBusReporter, StatusSlot};
use crate::{AppState, RunHandle};

/// POST /import/batch request
#[derive(Debug, Deserialize)]
pub struct BatchImportRequest {
    pub records: Vec<RawRecord>,
}

/// Response for a newly started run
#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: Uuid,
    pub kind: RunKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<Uuid>,
    pub total: usize,
    pub started_at: DateTime<Utc>,
}

/// GET /import/status response
#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    pub run_id: Uuid,
    pub kind: RunKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<Uuid>,
    /// Still registered as the active run
    pub active: bool,
    pub cancelled: bool,
    pub percentage: f64,
    pub status: ImportStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// POST /import/cancel response
#[derive(Debug, Serialize)]
pub struct CancelRunResponse {
    pub run_id: Uuid,
    pub cancel_requested: bool,
    pub processed: usize,
    pub total: usize,
}

/// Work handed to a background run
enum RunInput {
    Records(Vec<RawRecord>),
    Failures(Vec<ImportError>),
}

impl RunInput {
    fn len(&self) -> usize {
        match self {
            RunInput::Records(records) => records.len(),
            RunInput::Failures(failed) => failed.len(),
        }
    }
}

/// POST /import/batch
///
/// Start a batch run. Returns 409 if another run is active.
pub async fn start_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchImportRequest>,
) -> ApiResult<Json<StartRunResponse>> {
    launch_run(&state, RunKind::Batch, None, RunInput::Records(request.records))
        .await
        .map(Json)
}

/// POST /import/retry/{run_id}
///
/// Re-run the failed records of a finished run as a new retry run.
pub async fn retry_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<StartRunResponse>> {
    if state.runs.read().await.contains_key(&run_id) {
        return Err(ApiError::Conflict(format!(
            "Import run still active: {}",
            run_id
        )));
    }

    let previous = load_run(&state.db, run_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Import run not found: {}", run_id)))?;

    if previous.status.failed.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Import run has no failed records: {}",
            run_id
        )));
    }

    launch_run(
        &state,
        RunKind::Retry,
        Some(run_id),
        RunInput::Failures(previous.status.failed),
    )
    .await
    .map(Json)
}

/// GET /import/status/{run_id}
///
/// Live status for the active run, persisted status otherwise.
pub async fn get_run_status(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<RunStatusResponse>> {
    let live = state.runs.read().await.get(&run_id).cloned();

    if let Some(handle) = live {
        let status = read_slot(&handle.status)?;
        return Ok(Json(RunStatusResponse {
            run_id,
            kind: handle.kind,
            parent_run_id: handle.parent_run_id,
            active: true,
            cancelled: handle.cancel.is_cancelled(),
            percentage: status.snapshot().percentage(),
            status,
            started_at: handle.started_at,
            ended_at: None,
        }));
    }

    let run = load_run(&state.db, run_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Import run not found: {}", run_id)))?;

    tracing::debug!(run_id = %run_id, processed = run.status.processed, "Status query");

    Ok(Json(RunStatusResponse {
        run_id,
        kind: run.kind,
        parent_run_id: run.parent_run_id,
        active: false,
        cancelled: run.cancelled,
        percentage: run.status.snapshot().percentage(),
        status: run.status,
        started_at: run.started_at,
        ended_at: run.ended_at,
    }))
}

/// POST /import/cancel/{run_id}
///
/// Trip the run's cancellation token. The run stops before its next record.
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<CancelRunResponse>> {
    let live = state.runs.read().await.get(&run_id).cloned();

    let Some(handle) = live else {
        return match load_run(&state.db, run_id).await? {
            Some(_) => Err(ApiError::BadRequest(format!(
                "Import run already finished: {}",
                run_id
            ))),
            None => Err(ApiError::NotFound(format!("Import run not found: {}", run_id))),
        };
    };

    handle.cancel.cancel();
    let status = read_slot(&handle.status)?;

    tracing::info!(run_id = %run_id, processed = status.processed, "Import run cancellation requested");

    Ok(Json(CancelRunResponse {
        run_id,
        cancel_requested: true,
        processed: status.processed,
        total: status.total,
    }))
}

fn read_slot(slot: &StatusSlot) -> ApiResult<ImportStatus> {
    slot.read()
        .map(|status| status.clone())
        .map_err(|_| ApiError::Internal("Run status lock poisoned".to_string()))
}

/// Register, persist and spawn a run
async fn launch_run(
    state: &AppState,
    kind: RunKind,
    parent_run_id: Option<Uuid>,
    input: RunInput,
) -> ApiResult<StartRunResponse> {
    let total = input.len();
    let max = state.processor.config().max_batch_size;
    if max > 0 && total > max {
        return Err(BatchError::BatchTooLarge { size: total, max }.into());
    }

    let mut run = ImportRun::new(kind, parent_run_id);
    run.status = ImportStatus::started(total);

    let handle = RunHandle {
        kind,
        parent_run_id,
        cancel: CancellationToken::new(),
        status: Arc::new(RwLock::new(run.status.clone())),
        started_at: run.started_at,
    };

    {
        let mut runs = state.runs.write().await;
        if let Some(active) = runs.keys().next() {
            return Err(ApiError::Conflict(format!(
                "Import run already active: {}",
                active
            )));
        }
        runs.insert(run.run_id, handle.clone());
    }

    if let Err(e) = save_run(&state.db, &run).await {
        state.runs.write().await.remove(&run.run_id);
        return Err(e.into());
    }

    state.event_bus.emit_lossy(CatalogEvent::ImportRunStarted {
        run_id: run.run_id,
        kind: kind.as_str().to_string(),
        total,
        timestamp: Utc::now(),
    });

    tracing::info!(
        run_id = %run.run_id,
        kind = kind.as_str(),
        parent_run_id = ?parent_run_id,
        total,
        "Import run started"
    );

    let response = StartRunResponse {
        run_id: run.run_id,
        kind,
        parent_run_id,
        total,
        started_at: run.started_at,
    };

    tokio::spawn(execute_run(state.clone(), run, handle, input));

    Ok(response)
}

/// Background task for one run
async fn execute_run(state: AppState, mut run: ImportRun, handle: RunHandle, input: RunInput) {
    let run_id = run.run_id;
    let started = Instant::now();
    let reporter =
        EventBusReporter::new(run_id, state.event_bus.clone()).with_status_slot(handle.status.clone());

    let outcome = match input {
        RunInput::Records(records) => {
            state
                .processor
                .process_batch_with_cancel(records, Some(&reporter), &handle.cancel)
                .await
        }
        RunInput::Failures(failed) => {
            state
                .processor
                .process_failed_records_with_cancel(&failed, Some(&reporter), &handle.cancel)
                .await
        }
    };

    run.ended_at = Some(Utc::now());
    let final_event = match outcome {
        Ok(result) => {
            run.cancelled = result.cancelled;
            run.status = result.status;
            if run.cancelled {
                CatalogEvent::ImportRunCancelled {
                    run_id,
                    processed: run.status.processed,
                    total: run.status.total,
                    timestamp: Utc::now(),
                }
            } else {
                CatalogEvent::ImportRunCompleted {
                    run_id,
                    total: run.status.total,
                    successful: run.status.successful,
                    failed: run.status.failed.len(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                }
            }
        }
        Err(e) => {
            tracing::error!(run_id = %run_id, error = %e, "Import run failed");
            run.status.finish();
            *state.last_error.write().await = Some(e.to_string());
            CatalogEvent::ImportRunFailed {
                run_id,
                error: e.to_string(),
                timestamp: Utc::now(),
            }
        }
    };

    if let Err(e) = save_run(&state.db, &run).await {
        tracing::error!(run_id = %run_id, error = %e, "Failed to persist import run");
        *state.last_error.write().await = Some(format!("Failed to persist run {}: {}", run_id, e));
    }
    state.runs.write().await.remove(&run_id);
    state.event_bus.emit_lossy(final_event);

    tracing::info!(
        run_id = %run_id,
        successful = run.status.successful,
        failed = run.status.failed.len(),
        cancelled = run.cancelled,
        "Import run finished"
    );
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/batch", post(start_batch))
        .route("/import/retry/:run_id", post(retry_run))
        .route("/import/status/:run_id", get(get_run_status))
        .route("/import/cancel/:run_id", post(cancel_run))
}
