//! Store collaborator contract
//!
//! The import pipeline only needs three capabilities from the catalog store:
//! filtered query, create and partial update. `crate::db::SqliteToolStore`
//! is the production implementation; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::EnrichedRecord;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool not found: {0}")]
    NotFound(Uuid),

    /// Backend-specific failure not covered above
    #[error("{0}")]
    Backend(String),
}

/// Query filter; every `Some` field must match exactly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolFilter {
    pub name: Option<String>,
    pub link: Option<String>,
    pub deleted: Option<bool>,
}

impl ToolFilter {
    /// "name = X AND link = Y AND deleted = false"
    pub fn live_duplicate_of(name: &str, link: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            link: Some(link.to_string()),
            deleted: Some(false),
        }
    }

    /// Every non-deleted tool
    pub fn live() -> Self {
        Self {
            deleted: Some(false),
            ..Self::default()
        }
    }

    pub fn matches(&self, tool: &StoredTool) -> bool {
        self.name.as_ref().map_or(true, |n| *n == tool.name)
            && self.link.as_ref().map_or(true, |l| *l == tool.link)
            && self.deleted.map_or(true, |d| d == tool.deleted)
    }
}

/// Tool as persisted in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTool {
    pub id: Uuid,
    pub name: String,
    pub link: String,
    pub category: String,
    pub source: String,
    pub brand: String,
    /// Enrichment output as stored; older rows may not match `EnrichedRecord`
    pub summary: serde_json::Value,
    pub deleted: bool,
}

impl StoredTool {
    /// Canonical link recorded in the stored summary, if any
    pub fn canonical_link(&self) -> Option<&str> {
        self.summary
            .get("canonicalLink")
            .or_else(|| self.summary.get("derivedLink"))
            .and_then(|l| l.as_str())
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// True when the stored summary lacks a non-empty concept list
    pub fn needs_enrichment(&self) -> bool {
        self.summary
            .get("concepts")
            .and_then(|c| c.as_array())
            .map_or(true, |c| c.is_empty())
    }
}

/// Fields for a new tool
#[derive(Debug, Clone, PartialEq)]
pub struct NewTool {
    pub name: String,
    pub link: String,
    pub category: String,
    pub source: String,
    pub brand: String,
    pub summary: EnrichedRecord,
    pub deleted: bool,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolUpdate {
    pub name: Option<String>,
    pub link: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub brand: Option<String>,
    pub summary: Option<EnrichedRecord>,
    pub deleted: Option<bool>,
}

impl ToolUpdate {
    /// Soft delete
    pub fn mark_deleted() -> Self {
        Self {
            deleted: Some(true),
            ..Self::default()
        }
    }
}

/// Catalog store capabilities used by the import pipeline
#[async_trait]
pub trait ToolStore: Send + Sync {
    async fn query(&self, filter: &ToolFilter) -> Result<Vec<StoredTool>, StoreError>;

    async fn create(&self, tool: NewTool) -> Result<Uuid, StoreError>;

    async fn update(&self, id: Uuid, update: ToolUpdate) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str, link: &str, deleted: bool) -> StoredTool {
        StoredTool {
            id: Uuid::new_v4(),
            name: name.to_string(),
            link: link.to_string(),
            category: "Coding".to_string(),
            source: "batch-import".to_string(),
            brand: String::new(),
            summary: json!({}),
            deleted,
        }
    }

    #[test]
    fn test_duplicate_filter_is_exact() {
        let filter = ToolFilter::live_duplicate_of("Cursor", "https://cursor.com");

        assert!(filter.matches(&tool("Cursor", "https://cursor.com", false)));
        assert!(!filter.matches(&tool("cursor", "https://cursor.com", false)));
        assert!(!filter.matches(&tool("Cursor", "https://cursor.com/", false)));
        assert!(!filter.matches(&tool("Cursor", "https://cursor.com", true)));
    }

    #[test]
    fn test_needs_enrichment() {
        let mut t = tool("Cursor", "https://cursor.com", false);
        assert!(t.needs_enrichment());

        t.summary = json!({"concepts": []});
        assert!(t.needs_enrichment());

        t.summary = json!({"concepts": ["agents"]});
        assert!(!t.needs_enrichment());
    }

    #[test]
    fn test_canonical_link_from_partial_summary() {
        let mut t = tool("Cursor", "https://cursor.com", false);
        assert_eq!(t.canonical_link(), None);

        t.summary = json!({"derivedLink": "https://www.cursor.com"});
        assert_eq!(t.canonical_link(), Some("https://www.cursor.com"));

        t.summary = json!({"canonicalLink": " "});
        assert_eq!(t.canonical_link(), None);
    }
}
