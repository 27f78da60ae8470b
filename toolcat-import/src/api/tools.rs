//! Catalog maintenance endpoints

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use toolcat_common::events::CatalogEvent;

use crate::error::{ApiError, ApiResult};
use crate::services::RefreshSummary;
use crate::AppState;

/// POST /tools/refresh
///
/// Re-enrich every live tool whose stored summary has no concepts. Runs to
/// completion before responding. Rejected with 409 while an import run is
/// active.
pub async fn refresh_tools(State(state): State<AppState>) -> ApiResult<Json<RefreshSummary>> {
    if let Some(active) = state.runs.read().await.keys().next() {
        return Err(ApiError::Conflict(format!(
            "Import run active, refresh refused: {}",
            active
        )));
    }

    let summary = state.refresher.refresh_incomplete().await?;

    state.event_bus.emit_lossy(CatalogEvent::ToolsRefreshed {
        examined: summary.examined,
        updated: summary.updated,
        failed: summary.failed,
        timestamp: Utc::now(),
    });

    Ok(Json(summary))
}

/// Build catalog maintenance routes
pub fn tool_routes() -> Router<AppState> {
    Router::new().route("/tools/refresh", post(refresh_tools))
}
