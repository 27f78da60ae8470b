//! Duplicate detection against the catalog store
//!
//! A record is a duplicate only when a non-deleted tool has exactly the same
//! name and link: case-sensitive, no URL normalization. `https://x.com` and
//! `https://x.com/` are distinct tools and both get imported.

use std::sync::Arc;

use super::tool_store::{StoreError, ToolFilter, ToolStore};

/// Exact-match duplicate checker
pub struct DuplicateChecker {
    store: Arc<dyn ToolStore>,
}

impl DuplicateChecker {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }

    /// True if a live tool with this exact `(name, link)` exists
    pub async fn exists(&self, name: &str, link: &str) -> Result<bool, StoreError> {
        let matches = self
            .store
            .query(&ToolFilter::live_duplicate_of(name, link))
            .await?;

        if !matches.is_empty() {
            tracing::debug!(
                name = %name,
                link = %link,
                existing_id = %matches[0].id,
                "Duplicate tool found"
            );
        }

        Ok(!matches.is_empty())
    }
}
