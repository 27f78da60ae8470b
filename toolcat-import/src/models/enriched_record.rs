//! Enrichment contract types
//!
//! Wire names are camelCase to match the enrichment service and the
//! `summary` JSON stored alongside each tool.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Request sent to the enrichment collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub name: String,
    pub link: String,
    /// Where the tool was discovered (e.g. "batch-import")
    pub source: String,
    /// Category hint; enrichment treats it as the preferred category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Structured record produced by enrichment
///
/// Produced once per successful enrichment and never mutated afterwards;
/// a retry produces a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    pub name: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    pub concepts: Vec<String>,
    pub use_cases: Vec<String>,
    pub api_available: bool,
    pub summary: String,
    /// Better link proposed by enrichment (`derivedLink` in older payloads)
    #[serde(default, alias = "derivedLink", skip_serializing_if = "Option::is_none")]
    pub canonical_link: Option<String>,
}

impl EnrichedRecord {
    /// Link to persist: the canonical link when enrichment proposed one
    pub fn effective_link<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.canonical_link.as_deref().unwrap_or(fallback)
    }
}
