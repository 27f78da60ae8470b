//! Import pipeline services
//!
//! Leaves first: validation and dedup, the two external collaborators
//! (enrichment, store), progress reporting, then the batch processor that
//! sequences them and the refresher that re-enriches stored records.

pub mod batch_processor;
pub mod duplicate_checker;
pub mod enrichment_client;
pub mod progress;
pub mod record_refresher;
pub mod record_validator;
pub mod tool_store;

pub use batch_processor::{BatchError, BatchProcessor, BatchProcessorConfig};
pub use duplicate_checker::DuplicateChecker;
pub use enrichment_client::{EnrichmentClient, EnrichmentError, HttpEnrichmentClient};
pub use progress::{EventBusReporter, ProgressReporter, StatusSlot};
pub use record_refresher::{RecordRefresher, RefreshSummary};
pub use record_validator::{validate, InvalidReason, ValidationOutcome};
pub use tool_store::{NewTool, StoreError, StoredTool, ToolFilter, ToolStore, ToolUpdate};
