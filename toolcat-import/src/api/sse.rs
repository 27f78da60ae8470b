//! Server-Sent Events (SSE) for import progress streaming

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Optional stream filter
#[derive(Debug, Default, Deserialize)]
pub struct EventStreamQuery {
    /// Only forward events of this run (run-less events are always forwarded)
    pub run_id: Option<Uuid>,
}

/// GET /import/events - SSE stream of catalog events
///
/// Streams ImportRunStarted, ImportProgressUpdate, ImportRunCompleted,
/// ImportRunCancelled, ImportRunFailed and ToolsRefreshed.
pub async fn import_event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(run_id = ?query.run_id, "New SSE client connected to import events");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    let event = match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "SSE: Client lagged, events dropped");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    if let (Some(wanted), Some(run_id)) = (query.run_id, event.run_id()) {
                        if wanted != run_id {
                            continue;
                        }
                    }

                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            debug!("SSE: Broadcasting event: {}", event_type);
                            yield Ok(Event::default().event(event_type).data(event_json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}

/// Build event stream routes
pub fn event_routes() -> Router<AppState> {
    Router::new().route("/import/events", get(import_event_stream))
}
