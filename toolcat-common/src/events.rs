//! Event system for Toolcat
//!
//! Provides the shared event definitions and EventBus used to fan out
//! import progress to SSE clients and other in-process listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Record currently moving through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub name: String,
    pub link: String,
}

/// Most recent per-record failure, carried in progress updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Batch-local index of the failing record
    pub index: usize,
    pub record: RecordRef,
    /// Failure code (e.g. "DUPLICATE_EXISTS")
    pub code: String,
    pub message: String,
}

/// Compact progress view of a running import
///
/// Carries failure counts rather than the full failure list so that
/// per-record updates stay constant-size on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub is_running: bool,
    pub current_record: Option<RecordRef>,
    pub last_failure: Option<FailureInfo>,
}

impl ImportProgressSnapshot {
    /// Percentage complete (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Toolcat event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// A batch or retry run was accepted and started
    ImportRunStarted {
        run_id: Uuid,
        /// "batch" or "retry"
        kind: String,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Progress snapshot emitted after every pipeline state change
    ImportProgressUpdate {
        run_id: Uuid,
        progress: ImportProgressSnapshot,
        timestamp: DateTime<Utc>,
    },

    /// Every record of the run has been attempted
    ImportRunCompleted {
        run_id: Uuid,
        total: usize,
        successful: usize,
        failed: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Run stopped early by a cancellation request
    ImportRunCancelled {
        run_id: Uuid,
        processed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Run failed at the orchestration level (no per-record results)
    ImportRunFailed {
        run_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Re-enrichment sweep over incomplete stored records finished
    ToolsRefreshed {
        examined: usize,
        updated: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl CatalogEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ImportRunStarted { .. } => "ImportRunStarted",
            CatalogEvent::ImportProgressUpdate { .. } => "ImportProgressUpdate",
            CatalogEvent::ImportRunCompleted { .. } => "ImportRunCompleted",
            CatalogEvent::ImportRunCancelled { .. } => "ImportRunCancelled",
            CatalogEvent::ImportRunFailed { .. } => "ImportRunFailed",
            CatalogEvent::ToolsRefreshed { .. } => "ToolsRefreshed",
        }
    }

    /// Run the event belongs to, if any
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            CatalogEvent::ImportRunStarted { run_id, .. }
            | CatalogEvent::ImportProgressUpdate { run_id, .. }
            | CatalogEvent::ImportRunCompleted { run_id, .. }
            | CatalogEvent::ImportRunCancelled { run_id, .. }
            | CatalogEvent::ImportRunFailed { run_id, .. } => Some(*run_id),
            CatalogEvent::ToolsRefreshed { .. } => None,
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the import loop)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use toolcat_common::events::{CatalogEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CatalogEvent::ToolsRefreshed {
///     examined: 3,
///     updated: 2,
///     failed: 1,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CatalogEvent,
    ) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(CatalogEvent::ImportRunFailed {
            run_id: Uuid::new_v4(),
            error: "boom".to_string(),
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let run_id = Uuid::new_v4();

        bus.emit_lossy(CatalogEvent::ImportRunStarted {
            run_id,
            kind: "batch".to_string(),
            total: 2,
            timestamp: Utc::now(),
        });
        bus.emit_lossy(CatalogEvent::ImportRunCancelled {
            run_id,
            processed: 1,
            total: 2,
            timestamp: Utc::now(),
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "ImportRunStarted");
        assert_eq!(second.event_type(), "ImportRunCancelled");
        assert_eq!(second.run_id(), Some(run_id));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CatalogEvent::ToolsRefreshed {
            examined: 1,
            updated: 1,
            failed: 0,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ToolsRefreshed");
        assert_eq!(json["updated"], 1);
    }

    #[test]
    fn test_snapshot_percentage() {
        let snapshot = ImportProgressSnapshot {
            total: 4,
            processed: 1,
            successful: 1,
            failed: 0,
            is_running: true,
            current_record: None,
            last_failure: None,
        };
        assert_eq!(snapshot.percentage(), 25.0);

        let empty = ImportProgressSnapshot { total: 0, processed: 0, ..snapshot };
        assert_eq!(empty.percentage(), 0.0);
    }
}
