//! Enrichment collaborator
//!
//! Turns a `(name, link)` pair into a structured `EnrichedRecord`. The
//! pipeline sees only the `EnrichmentClient` trait; `HttpEnrichmentClient`
//! talks to the enrichment service over JSON/HTTP and normalizes whatever
//! it returns into a complete record.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use toolcat_common::config::EnrichmentConfig;
use url::Url;

use crate::models::{EnrichedRecord, EnrichmentRequest};

const USER_AGENT: &str = concat!("toolcat-import/", env!("CARGO_PKG_VERSION"));
/// Category used when neither enrichment nor the caller supplies one
pub const FALLBACK_CATEGORY: &str = "Unknown";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Enrichment errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Enrichment timed out after {0}s")]
    Timeout(u64),

    #[error("Upstream error {0}: {1}")]
    Upstream(u16, String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid enrichment endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Enrichment capability
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    async fn enrich(&self, request: &EnrichmentRequest) -> Result<EnrichedRecord, EnrichmentError>;
}

/// Upstream payload before normalization; every field may be absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResponse {
    pub name: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub concepts: Option<Vec<String>>,
    pub use_cases: Option<Vec<String>>,
    pub api_available: Option<bool>,
    pub summary: Option<String>,
    #[serde(alias = "derivedLink")]
    pub canonical_link: Option<String>,
}

/// Build a complete record from a partial upstream payload
///
/// - `name` is always the requested name; upstream renames are ignored
/// - `category`: upstream value, else the request hint, else "Unknown"
/// - list fields are trimmed and blank entries dropped; tags are de-duplicated
/// - `canonical_link` survives only as an absolute URL with a host
pub fn normalize(request: &EnrichmentRequest, response: EnrichmentResponse) -> EnrichedRecord {
    let category = non_blank(response.category)
        .or_else(|| non_blank(request.category.clone()))
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    let tags: BTreeSet<String> = clean_list(response.tags).into_iter().collect();

    let canonical_link = non_blank(response.canonical_link).filter(|link| {
        Url::parse(link).map(|u| u.has_host()).unwrap_or(false)
    });

    EnrichedRecord {
        name: request.name.clone(),
        category,
        tags,
        concepts: clean_list(response.concepts),
        use_cases: clean_list(response.use_cases),
        api_available: response.api_available.unwrap_or(false),
        summary: response.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
        canonical_link,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// HTTP enrichment client
pub struct HttpEnrichmentClient {
    http_client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpEnrichmentClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EnrichmentError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| EnrichmentError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            EnrichmentError::InvalidEndpoint("enrichment.endpoint is not configured".to_string())
        })?;
        Self::new(
            endpoint,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl EnrichmentClient for HttpEnrichmentClient {
    async fn enrich(&self, request: &EnrichmentRequest) -> Result<EnrichedRecord, EnrichmentError> {
        tracing::debug!(
            name = %request.name,
            link = %request.link,
            endpoint = %self.endpoint,
            "Requesting enrichment"
        );

        let mut builder = self.http_client.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EnrichmentError::Timeout(self.timeout_secs)
            } else {
                EnrichmentError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Upstream(status.as_u16(), error_message(&body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;
        let payload: EnrichmentResponse = serde_json::from_str(&body)
            .map_err(|e| EnrichmentError::MalformedResponse(e.to_string()))?;

        let record = normalize(request, payload);

        tracing::info!(
            name = %record.name,
            category = %record.category,
            tags = record.tags.len(),
            concepts = record.concepts.len(),
            "Enrichment complete"
        );

        Ok(record)
    }
}

/// Best human-readable message from an error body
///
/// Prefers `error.message` or `message` from a JSON body, falling back to the
/// raw text truncated to a readable length.
fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let message = json
            .pointer("/error/message")
            .or_else(|| json.get("message"))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", truncated)
    } else {
        trimmed.to_string()
    }
}
