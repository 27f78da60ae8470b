//! Progress reporting
//!
//! The batch processor calls the reporter synchronously, from the same task
//! that runs the pipeline, after every status change. Reporters receive a
//! shared reference and must return quickly: a slow reporter stalls the batch.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use toolcat_common::events::{CatalogEvent, EventBus};
use uuid::Uuid;

use crate::models::ImportStatus;

/// Receives status snapshots from a running batch
pub trait ProgressReporter: Send + Sync {
    fn report(&self, status: &ImportStatus);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ImportStatus) + Send + Sync,
{
    fn report(&self, status: &ImportStatus) {
        self(status)
    }
}

/// Shared slot holding the most recent status of a run
pub type StatusSlot = Arc<RwLock<ImportStatus>>;

/// Publishes progress to the EventBus and, optionally, a shared status slot
pub struct EventBusReporter {
    run_id: Uuid,
    event_bus: EventBus,
    latest: Option<StatusSlot>,
}

impl EventBusReporter {
    pub fn new(run_id: Uuid, event_bus: EventBus) -> Self {
        Self {
            run_id,
            event_bus,
            latest: None,
        }
    }

    /// Also copy every reported status into `slot`
    pub fn with_status_slot(mut self, slot: StatusSlot) -> Self {
        self.latest = Some(slot);
        self
    }
}

impl ProgressReporter for EventBusReporter {
    fn report(&self, status: &ImportStatus) {
        if let Some(slot) = &self.latest {
            match slot.write() {
                Ok(mut latest) => *latest = status.clone(),
                Err(_) => tracing::warn!(run_id = %self.run_id, "Status slot poisoned, skipping update"),
            }
        }

        self.event_bus.emit_lossy(CatalogEvent::ImportProgressUpdate {
            run_id: self.run_id,
            progress: status.snapshot(),
            timestamp: Utc::now(),
        });
    }
}
