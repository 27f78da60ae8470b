//! HttpEnrichmentClient against a mock enrichment service

use std::time::Duration;

use serde_json::json;
use toolcat_import::models::EnrichmentRequest;
use toolcat_import::services::{EnrichmentClient, EnrichmentError, HttpEnrichmentClient};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> EnrichmentRequest {
    EnrichmentRequest {
        name: "Perplexity".to_string(),
        link: "https://perplexity.ai".to_string(),
        source: "batch-import".to_string(),
        category: None,
    }
}

fn client(server: &MockServer, timeout: Duration) -> HttpEnrichmentClient {
    HttpEnrichmentClient::new(
        &format!("{}/enrich", server.uri()),
        Some("test-key".to_string()),
        timeout,
    )
    .unwrap()
}

#[tokio::test]
async fn test_successful_enrichment_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enrich"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "name": "Perplexity",
            "link": "https://perplexity.ai",
            "source": "batch-import"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Perplexity AI",
            "category": "Search",
            "tags": ["AI", " AI ", ""],
            "concepts": ["answer engine"],
            "useCases": ["research"],
            "derivedLink": "https://www.perplexity.ai"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server, Duration::from_secs(5))
        .enrich(&request())
        .await
        .unwrap();

    assert_eq!(record.name, "Perplexity");
    assert_eq!(record.category, "Search");
    assert_eq!(record.tags.len(), 1);
    assert_eq!(record.concepts, vec!["answer engine"]);
    assert_eq!(record.use_cases, vec!["research"]);
    assert!(!record.api_available);
    assert_eq!(record.summary, "");
    assert_eq!(record.canonical_link.as_deref(), Some("https://www.perplexity.ai"));
}

#[tokio::test]
async fn test_upstream_error_message_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "rate limited"}})),
        )
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .enrich(&request())
        .await
        .unwrap_err();

    assert_eq!(err, EnrichmentError::Upstream(429, "rate limited".to_string()));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .enrich(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichmentError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = HttpEnrichmentClient::new(
        &format!("{}/enrich", server.uri()),
        None,
        Duration::from_millis(200),
    )
    .unwrap()
    .enrich(&request())
    .await
    .unwrap_err();

    assert!(matches!(err, EnrichmentError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Nothing listens on port 9 (discard) in the test environment
    let err = HttpEnrichmentClient::new("http://127.0.0.1:9/enrich", None, Duration::from_secs(2))
        .unwrap()
        .enrich(&request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EnrichmentError::Network(_) | EnrichmentError::Timeout(_)
    ));
}
