//! Import run status and per-record failures
//!
//! `ImportStatus` is the only mutable aggregate of a run. It is created fresh
//! by every batch call, mutated only by the batch processor, and handed to
//! progress consumers by shared reference.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolcat_common::events::{FailureInfo, ImportProgressSnapshot, RecordRef};

use super::RawRecord;

/// Per-record failure taxonomy
///
/// Closed set; every variant is non-fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportFailure {
    #[error("Missing name")]
    MissingName,

    #[error("Missing link")]
    MissingLink,

    #[error("Malformed URL")]
    MalformedUrl,

    #[error("A tool with the same name and link already exists")]
    DuplicateExists,

    #[error("Enrichment failed: {0}")]
    EnrichmentFailed(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),
}

impl ImportFailure {
    /// Stable failure code
    pub fn code(&self) -> &'static str {
        match self {
            ImportFailure::MissingName => "MISSING_NAME",
            ImportFailure::MissingLink => "MISSING_LINK",
            ImportFailure::MalformedUrl => "MALFORMED_URL",
            ImportFailure::DuplicateExists => "DUPLICATE_EXISTS",
            ImportFailure::EnrichmentFailed(_) => "ENRICHMENT_FAILED",
            ImportFailure::PersistenceFailed(_) => "PERSISTENCE_FAILED",
        }
    }
}

/// One failed record of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    pub record: RawRecord,
    /// Position within the batch passed to the call that produced this error
    pub index: usize,
    pub reason: ImportFailure,
}

impl ImportError {
    pub fn new(record: RawRecord, index: usize, reason: ImportFailure) -> Self {
        Self {
            record,
            index,
            reason,
        }
    }

    /// Human-readable reason
    pub fn message(&self) -> String {
        self.reason.to_string()
    }
}

/// Running status of one batch call
///
/// Invariants, held at every progress emission:
/// - `processed <= total`
/// - `successful + failed.len() == processed`
/// - `is_running` is true strictly between start and completion
/// - `current_record` is set only while that record is mid-pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: Vec<ImportError>,
    pub is_running: bool,
    pub current_record: Option<RawRecord>,
}

impl ImportStatus {
    /// Status of a run that is about to process `total` records
    pub(crate) fn started(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            successful: 0,
            failed: Vec::new(),
            is_running: true,
            current_record: None,
        }
    }

    pub(crate) fn begin_record(&mut self, record: &RawRecord) {
        self.current_record = Some(record.clone());
    }

    pub(crate) fn record_success(&mut self) {
        self.successful += 1;
        self.processed += 1;
        self.current_record = None;
    }

    pub(crate) fn record_failure(&mut self, error: ImportError) {
        self.failed.push(error);
        self.processed += 1;
        self.current_record = None;
    }

    pub(crate) fn finish(&mut self) {
        self.is_running = false;
        self.current_record = None;
    }

    /// True once every record of the run has been attempted
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }

    /// Check the counting invariants
    pub fn is_consistent(&self) -> bool {
        self.processed <= self.total && self.successful + self.failed.len() == self.processed
    }

    /// Compact view for event streaming
    pub fn snapshot(&self) -> ImportProgressSnapshot {
        ImportProgressSnapshot {
            total: self.total,
            processed: self.processed,
            successful: self.successful,
            failed: self.failed.len(),
            is_running: self.is_running,
            current_record: self.current_record.as_ref().map(RecordRef::from),
            last_failure: self.failed.last().map(|e| FailureInfo {
                index: e.index,
                record: RecordRef::from(&e.record),
                code: e.reason.code().to_string(),
                message: e.message(),
            }),
        }
    }
}

impl Default for ImportStatus {
    fn default() -> Self {
        Self {
            total: 0,
            processed: 0,
            successful: 0,
            failed: Vec::new(),
            is_running: false,
            current_record: None,
        }
    }
}

/// Outcome of one batch call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportResult {
    pub status: ImportStatus,
    pub successful_records: Vec<RawRecord>,
    pub failed_records: Vec<ImportError>,
    /// Run stopped early by cancellation; unattempted records appear in neither list
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_track_outcomes() {
        let a = RawRecord::new("A", "https://a.example");
        let b = RawRecord::new("B", "https://b.example");
        let mut status = ImportStatus::started(2);

        status.begin_record(&a);
        assert_eq!(status.current_record.as_ref(), Some(&a));
        status.record_success();
        assert!(status.current_record.is_none());

        status.begin_record(&b);
        status.record_failure(ImportError::new(b.clone(), 1, ImportFailure::DuplicateExists));

        assert_eq!(status.processed, 2);
        assert_eq!(status.successful, 1);
        assert!(status.is_consistent());
        assert!(status.is_complete());
        assert!(status.is_running);

        status.finish();
        assert!(!status.is_running);
    }

    #[test]
    fn test_failure_serializes_code_and_detail() {
        let json = serde_json::to_value(ImportFailure::EnrichmentFailed("timeout".into())).unwrap();
        assert_eq!(json["code"], "ENRICHMENT_FAILED");
        assert_eq!(json["detail"], "timeout");

        let json = serde_json::to_value(ImportFailure::MalformedUrl).unwrap();
        assert_eq!(json["code"], "MALFORMED_URL");
    }

    #[test]
    fn test_snapshot_carries_last_failure() {
        let c = RawRecord::new("C", "");
        let mut status = ImportStatus::started(1);
        status.begin_record(&c);
        status.record_failure(ImportError::new(c, 0, ImportFailure::MissingLink));

        let snapshot = status.snapshot();
        assert_eq!(snapshot.failed, 1);
        let failure = snapshot.last_failure.unwrap();
        assert_eq!(failure.code, "MISSING_LINK");
        assert_eq!(failure.message, "Missing link");
    }
}
