//! Batch import processor
//!
//! Drives each raw record through validate → dedup → enrich → persist,
//! strictly one record at a time and in input order. The dedup query and the
//! create call are not transactional, so sequential execution is what keeps
//! two records with the same `(name, link)` from both passing the dedup check.
//!
//! A run is `Idle → Running → Completed`. Every per-record failure becomes an
//! `ImportError` in the run's status; only orchestration problems (see
//! `BatchError`) fail the whole call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use toolcat_common::config::ImportConfig;
use uuid::Uuid;

use super::duplicate_checker::DuplicateChecker;
use super::enrichment_client::{EnrichmentClient, FALLBACK_CATEGORY};
use super::progress::ProgressReporter;
use super::record_validator::{validate, ValidationOutcome};
use super::tool_store::{NewTool, ToolStore};
use crate::models::{
    BatchImportResult, EnrichedRecord, EnrichmentRequest, ImportError, ImportFailure, ImportStatus,
    RawRecord,
};

/// Orchestration-level failures; no record was attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("Batch of {size} records exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },
}

/// Batch processor tuning
#[derive(Debug, Clone)]
pub struct BatchProcessorConfig {
    /// Pause after each record before starting the next one
    pub item_delay: Duration,
    /// Largest accepted batch; 0 disables the limit
    pub max_batch_size: usize,
    /// Source tag sent to enrichment and stored on every created tool
    pub source_tag: String,
}

impl Default for BatchProcessorConfig {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl From<&ImportConfig> for BatchProcessorConfig {
    fn from(config: &ImportConfig) -> Self {
        Self {
            item_delay: Duration::from_millis(config.item_delay_ms),
            max_batch_size: config.max_batch_size,
            source_tag: config.source_tag.clone(),
        }
    }
}

/// Sequential import pipeline over injected collaborators
pub struct BatchProcessor {
    enricher: Arc<dyn EnrichmentClient>,
    store: Arc<dyn ToolStore>,
    duplicates: DuplicateChecker,
    config: BatchProcessorConfig,
}

impl BatchProcessor {
    pub fn new(
        enricher: Arc<dyn EnrichmentClient>,
        store: Arc<dyn ToolStore>,
        config: BatchProcessorConfig,
    ) -> Self {
        Self {
            enricher,
            duplicates: DuplicateChecker::new(store.clone()),
            store,
            config,
        }
    }

    pub fn config(&self) -> &BatchProcessorConfig {
        &self.config
    }

    /// Import `records` in order
    pub async fn process_batch(
        &self,
        records: Vec<RawRecord>,
        reporter: Option<&dyn ProgressReporter>,
    ) -> Result<BatchImportResult, BatchError> {
        self.process_batch_with_cancel(records, reporter, &CancellationToken::new())
            .await
    }

    /// Re-run exactly the records of a previous run's failures
    ///
    /// Same pipeline as `process_batch`; indices in the new status refer to
    /// positions within `failed`, and the previous status is not merged in.
    pub async fn process_failed_records(
        &self,
        failed: &[ImportError],
        reporter: Option<&dyn ProgressReporter>,
    ) -> Result<BatchImportResult, BatchError> {
        self.process_batch(Self::records_of(failed), reporter).await
    }

    /// `process_failed_records` with a cancellation token
    pub async fn process_failed_records_with_cancel(
        &self,
        failed: &[ImportError],
        reporter: Option<&dyn ProgressReporter>,
        cancel: &CancellationToken,
    ) -> Result<BatchImportResult, BatchError> {
        self.process_batch_with_cancel(Self::records_of(failed), reporter, cancel)
            .await
    }

    fn records_of(failed: &[ImportError]) -> Vec<RawRecord> {
        failed.iter().map(|f| f.record.clone()).collect()
    }

    /// Import `records`, checking `cancel` before each record
    ///
    /// A cancelled run stops between records and returns its partial status
    /// with `is_running == false` and `cancelled == true`.
    pub async fn process_batch_with_cancel(
        &self,
        records: Vec<RawRecord>,
        reporter: Option<&dyn ProgressReporter>,
        cancel: &CancellationToken,
    ) -> Result<BatchImportResult, BatchError> {
        let max = self.config.max_batch_size;
        if max > 0 && records.len() > max {
            return Err(BatchError::BatchTooLarge {
                size: records.len(),
                max,
            });
        }

        let started = Instant::now();
        let total = records.len();
        let mut status = ImportStatus::started(total);
        let mut successful_records = Vec::new();
        let mut cancelled = false;

        tracing::info!(total, "Starting batch import");
        emit(reporter, &status);

        for (index, record) in records.into_iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    processed = status.processed,
                    total,
                    "Batch import cancelled"
                );
                cancelled = true;
                break;
            }

            status.begin_record(&record);
            emit(reporter, &status);

            match self.process_record(&record, index).await {
                Ok(tool_id) => {
                    tracing::info!(index, name = %record.name, %tool_id, "Record imported");
                    successful_records.push(record);
                    status.record_success();
                }
                Err(reason) => {
                    tracing::warn!(
                        index,
                        name = %record.name,
                        link = %record.link,
                        code = reason.code(),
                        error = %reason,
                        "Record import failed"
                    );
                    status.record_failure(ImportError::new(record, index, reason));
                }
            }

            debug_assert!(status.is_consistent());
            emit(reporter, &status);

            if index + 1 < total && !self.config.item_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.item_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        status.finish();
        emit(reporter, &status);

        tracing::info!(
            total,
            processed = status.processed,
            successful = status.successful,
            failed = status.failed.len(),
            cancelled,
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch import finished"
        );

        Ok(BatchImportResult {
            failed_records: status.failed.clone(),
            status,
            successful_records,
            cancelled,
        })
    }

    /// Run one record through the pipeline
    ///
    /// Each step short-circuits: an invalid record is never dedup-checked, a
    /// duplicate is never enriched, a failed enrichment is never persisted.
    async fn process_record(&self, record: &RawRecord, index: usize) -> Result<Uuid, ImportFailure> {
        if let ValidationOutcome::Invalid(reason) = validate(record, index) {
            return Err(reason.into());
        }

        match self.duplicates.exists(&record.name, &record.link).await {
            Ok(true) => return Err(ImportFailure::DuplicateExists),
            Ok(false) => {}
            Err(e) => {
                return Err(ImportFailure::PersistenceFailed(format!(
                    "duplicate check failed: {}",
                    e
                )))
            }
        }

        let request = EnrichmentRequest {
            name: record.name.clone(),
            link: record.link.clone(),
            source: self.config.source_tag.clone(),
            category: None,
        };
        let enriched = self
            .enricher
            .enrich(&request)
            .await
            .map_err(|e| ImportFailure::EnrichmentFailed(e.to_string()))?;

        self.store
            .create(self.new_tool(record, enriched))
            .await
            .map_err(|e| ImportFailure::PersistenceFailed(e.to_string()))
    }

    fn new_tool(&self, record: &RawRecord, enriched: EnrichedRecord) -> NewTool {
        let name = if enriched.name.trim().is_empty() {
            record.name.clone()
        } else {
            enriched.name.clone()
        };
        let category = if enriched.category.trim().is_empty() {
            FALLBACK_CATEGORY.to_string()
        } else {
            enriched.category.clone()
        };

        NewTool {
            name,
            link: enriched.effective_link(&record.link).to_string(),
            category,
            source: self.config.source_tag.clone(),
            brand: String::new(),
            summary: enriched,
            deleted: false,
        }
    }
}

fn emit(reporter: Option<&dyn ProgressReporter>, status: &ImportStatus) {
    if let Some(reporter) = reporter {
        reporter.report(status);
    }
}
