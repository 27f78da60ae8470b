//! toolcat-import library interface
//!
//! Exposes the import pipeline, its collaborators and the HTTP API for the
//! binary and for integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use toolcat_common::events::EventBus;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::models::RunKind;
use crate::services::{
    BatchProcessor, BatchProcessorConfig, EnrichmentClient, RecordRefresher, StatusSlot, ToolStore,
};

/// In-flight run tracked by the API
#[derive(Clone)]
pub struct RunHandle {
    pub kind: RunKind,
    pub parent_run_id: Option<Uuid>,
    pub cancel: CancellationToken,
    /// Latest status reported by the running batch
    pub status: StatusSlot,
    pub started_at: DateTime<Utc>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub processor: Arc<BatchProcessor>,
    pub refresher: Arc<RecordRefresher>,
    /// Active runs; a run is removed once its final status is persisted
    pub runs: Arc<RwLock<HashMap<Uuid, RunHandle>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        enricher: Arc<dyn EnrichmentClient>,
        store: Arc<dyn ToolStore>,
        config: BatchProcessorConfig,
    ) -> Self {
        let refresher = RecordRefresher::new(enricher.clone(), store.clone(), config.item_delay);
        Self {
            db,
            event_bus,
            processor: Arc::new(BatchProcessor::new(enricher, store, config)),
            refresher: Arc::new(refresher),
            runs: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::tool_routes())
        .merge(api::event_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
