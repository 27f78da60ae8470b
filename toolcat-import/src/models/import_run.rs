//! API-driven import runs
//!
//! A run wraps one batch call made through the HTTP API. Runs are the
//! caller-side history: a retry run points at the run whose failures it
//! re-processes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ImportStatus;

/// How a run was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Batch,
    Retry,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Batch => "batch",
            RunKind::Retry => "retry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "batch" => Some(RunKind::Batch),
            "retry" => Some(RunKind::Retry),
            _ => None,
        }
    }
}

/// Persisted record of one API-driven run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: Uuid,
    pub kind: RunKind,
    /// Run whose failures a retry re-processes
    pub parent_run_id: Option<Uuid>,
    pub status: ImportStatus,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ImportRun {
    pub fn new(kind: RunKind, parent_run_id: Option<Uuid>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            kind,
            parent_run_id,
            status: ImportStatus::default(),
            cancelled: false,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}
