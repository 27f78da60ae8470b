//! Re-enrichment of incomplete catalog entries
//!
//! Finds live tools whose stored summary has no concepts and runs them back
//! through enrichment, one at a time. Brand, source and the deleted flag are
//! left as stored.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::enrichment_client::EnrichmentClient;
use super::tool_store::{StoreError, StoredTool, ToolFilter, ToolStore, ToolUpdate};
use crate::models::EnrichmentRequest;

/// Outcome of one refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Incomplete tools found
    pub examined: usize,
    pub updated: usize,
    pub failed: usize,
}

pub struct RecordRefresher {
    enricher: Arc<dyn EnrichmentClient>,
    store: Arc<dyn ToolStore>,
    item_delay: Duration,
}

impl RecordRefresher {
    pub fn new(
        enricher: Arc<dyn EnrichmentClient>,
        store: Arc<dyn ToolStore>,
        item_delay: Duration,
    ) -> Self {
        Self {
            enricher,
            store,
            item_delay,
        }
    }

    /// Re-enrich every live tool with a missing concept list
    ///
    /// Only the initial query can fail the pass; per-tool enrichment or update
    /// failures are logged and counted.
    pub async fn refresh_incomplete(&self) -> Result<RefreshSummary, StoreError> {
        let candidates: Vec<StoredTool> = self
            .store
            .query(&ToolFilter::live())
            .await?
            .into_iter()
            .filter(StoredTool::needs_enrichment)
            .collect();

        let mut summary = RefreshSummary {
            examined: candidates.len(),
            ..Default::default()
        };
        tracing::info!(count = summary.examined, "Refreshing incomplete tools");

        for (i, tool) in candidates.iter().enumerate() {
            match self.refresh_one(tool).await {
                Ok(()) => summary.updated += 1,
                Err(message) => {
                    tracing::warn!(id = %tool.id, name = %tool.name, error = %message, "Tool refresh failed");
                    summary.failed += 1;
                }
            }

            if i + 1 < candidates.len() && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
        }

        tracing::info!(
            examined = summary.examined,
            updated = summary.updated,
            failed = summary.failed,
            "Refresh complete"
        );

        Ok(summary)
    }

    async fn refresh_one(&self, tool: &StoredTool) -> Result<(), String> {
        // A previously proposed canonical link beats the stored one
        let link = tool.canonical_link().unwrap_or(&tool.link).to_string();
        let hint = Some(tool.category.trim())
            .filter(|c| !c.is_empty())
            .map(String::from);

        let request = EnrichmentRequest {
            name: tool.name.clone(),
            link,
            source: tool.source.clone(),
            category: hint,
        };
        let enriched = self
            .enricher
            .enrich(&request)
            .await
            .map_err(|e| e.to_string())?;

        let update = ToolUpdate {
            name: Some(enriched.name.clone()),
            link: Some(enriched.effective_link(&request.link).to_string()),
            category: Some(enriched.category.clone()),
            summary: Some(enriched),
            ..Default::default()
        };

        self.store
            .update(tool.id, update)
            .await
            .map_err(|e| e.to_string())?;

        tracing::debug!(id = %tool.id, name = %tool.name, "Tool refreshed");
        Ok(())
    }
}
