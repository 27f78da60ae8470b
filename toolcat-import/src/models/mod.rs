//! Data models for toolcat-import
//!
//! - Raw import input and the enriched record produced for it
//! - Per-run import status and per-record failure taxonomy
//! - API-driven run history

pub mod enriched_record;
pub mod import_run;
pub mod import_status;
pub mod raw_record;

pub use enriched_record::{EnrichedRecord, EnrichmentRequest};
pub use import_run::{ImportRun, RunKind};
pub use import_status::{BatchImportResult, ImportError, ImportFailure, ImportStatus};
pub use raw_record::RawRecord;
