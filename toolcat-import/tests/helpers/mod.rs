//! Test helper utilities
//!
//! In-memory collaborators for exercising the import pipeline without a
//! database or an enrichment service.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use toolcat_import::models::{EnrichedRecord, EnrichmentRequest, RawRecord};
use toolcat_import::services::{
    EnrichmentClient, EnrichmentError, NewTool, StoreError, StoredTool, ToolFilter, ToolStore,
    ToolUpdate,
};
use uuid::Uuid;

/// Vec-backed tool store with call counters and scripted failures
#[derive(Default)]
pub struct FakeStore {
    pub tools: Mutex<Vec<StoredTool>>,
    pub query_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    /// Names whose create call fails
    pub fail_create_for: Mutex<HashSet<String>>,
    /// Every query fails while set
    pub fail_query: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a live tool
    pub fn with_tool(self, name: &str, link: &str) -> Self {
        self.tools.lock().unwrap().push(StoredTool {
            id: Uuid::new_v4(),
            name: name.to_string(),
            link: link.to_string(),
            category: "Coding".to_string(),
            source: "seed".to_string(),
            brand: String::new(),
            summary: serde_json::json!({}),
            deleted: false,
        });
        self
    }

    pub fn fail_create_for(&self, name: &str) {
        self.fail_create_for.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn queries(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.lock().unwrap().iter().map(|t| t.name.clone()).collect()
    }

    pub fn find(&self, name: &str) -> Option<StoredTool> {
        self.tools.lock().unwrap().iter().find(|t| t.name == name).cloned()
    }
}

#[async_trait]
impl ToolStore for FakeStore {
    async fn query(&self, filter: &ToolFilter) -> Result<Vec<StoredTool>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("db down".to_string()));
        }
        Ok(self
            .tools
            .lock()
            .unwrap()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn create(&self, tool: NewTool) -> Result<Uuid, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create_for.lock().unwrap().contains(&tool.name) {
            return Err(StoreError::Backend("disk full".to_string()));
        }

        let id = Uuid::new_v4();
        self.tools.lock().unwrap().push(StoredTool {
            id,
            name: tool.name,
            link: tool.link,
            category: tool.category,
            source: tool.source,
            brand: tool.brand,
            summary: serde_json::to_value(&tool.summary)?,
            deleted: tool.deleted,
        });
        Ok(id)
    }

    async fn update(&self, id: Uuid, update: ToolUpdate) -> Result<(), StoreError> {
        let mut tools = self.tools.lock().unwrap();
        let tool = tools
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(name) = update.name {
            tool.name = name;
        }
        if let Some(link) = update.link {
            tool.link = link;
        }
        if let Some(category) = update.category {
            tool.category = category;
        }
        if let Some(summary) = update.summary {
            tool.summary = serde_json::to_value(&summary)?;
        }
        if let Some(deleted) = update.deleted {
            tool.deleted = deleted;
        }
        Ok(())
    }
}

/// Scripted enrichment collaborator
#[derive(Default)]
pub struct FakeEnricher {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<EnrichmentRequest>>,
    /// Names whose enrichment fails with an upstream error
    pub failing: Mutex<HashSet<String>>,
    /// Canonical link proposed per name
    pub canonical: Mutex<HashMap<String, String>>,
    /// Simulated latency per call
    pub latency: Option<Duration>,
}

impl FakeEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn fail_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn propose_link(&self, name: &str, link: &str) {
        self.canonical
            .lock()
            .unwrap()
            .insert(name.to_string(), link.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentClient for FakeEnricher {
    async fn enrich(&self, request: &EnrichmentRequest) -> Result<EnrichedRecord, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.lock().unwrap().contains(&request.name) {
            return Err(EnrichmentError::Upstream(503, "service unavailable".to_string()));
        }

        Ok(EnrichedRecord {
            name: request.name.clone(),
            category: request
                .category
                .clone()
                .unwrap_or_else(|| "Productivity".to_string()),
            tags: ["AI".to_string()].into_iter().collect(),
            concepts: vec!["automation".to_string()],
            use_cases: vec!["testing".to_string()],
            api_available: true,
            summary: format!("{} summary", request.name),
            canonical_link: self.canonical.lock().unwrap().get(&request.name).cloned(),
        })
    }
}

pub fn record(name: &str, link: &str) -> RawRecord {
    RawRecord::new(name, link)
}
