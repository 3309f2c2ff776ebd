//! Tests for the OpenAI-compatible embedding backend.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::embeddings::api::{ApiConfig, EmbeddingApiClient};
use crate::embeddings::EmbeddingProvider;
use crate::error::ChainRagError;

const DIMS: usize = 2;

fn test_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-api-key".to_string()),
        model: "text-embedding-3-small".to_string(),
        timeout_secs: 10,
        max_retries: 2,
    }
}

fn client(server: &MockServer) -> EmbeddingApiClient {
    EmbeddingApiClient::new(test_config(&server.uri()), DIMS).unwrap()
}

fn embedding_response(embeddings: Vec<Vec<f32>>) -> serde_json::Value {
    json!({
        "data": embeddings.into_iter().map(|e| json!({ "embedding": e })).collect::<Vec<_>>()
    })
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_request_carries_model_input_and_bearer_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(body_json(json!({
            "model": "text-embedding-3-small",
            "input": ["[NORMAL TRANSACTION] incoming ETH"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.6, 0.8]])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .embed(&texts(&["[NORMAL TRANSACTION] incoming ETH"]))
        .await
        .unwrap();
    assert_eq!(result, vec![vec![0.6, 0.8]]);
}

#[tokio::test]
async fn test_reply_is_reordered_by_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        })))
        .mount(&server)
        .await;

    let result = client(&server).embed(&texts(&["a", "b"])).await.unwrap();
    assert_eq!(result, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_missing_vectors_are_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.1, 0.2]])),
        )
        .mount(&server)
        .await;

    let result = client(&server).embed(&texts(&["a", "b"])).await;
    assert!(matches!(result, Err(ChainRagError::Embedding(_))));
}

#[tokio::test]
async fn test_wrong_width_vectors_are_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(embedding_response(vec![vec![0.1, 0.2, 0.3]])),
        )
        .mount(&server)
        .await;

    match client(&server).embed(&texts(&["a"])).await {
        Err(ChainRagError::Embedding(message)) => {
            assert!(message.contains("3-dimensional"), "{message}");
            assert!(message.contains("expects 2"), "{message}");
        }
        other => panic!("expected dimension error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retried_then_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(3)
        .mount(&server)
        .await;

    let result = client(&server).embed(&texts(&["test"])).await;
    assert!(matches!(
        result,
        Err(ChainRagError::ApiRateLimit {
            retry_after: Some(7)
        })
    ));
}

#[tokio::test]
async fn test_server_error_recovers_on_retry() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with({
            let attempts = Arc::clone(&attempts);
            move |_: &wiremock::Request| {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200)
                        .set_body_json(embedding_response(vec![vec![0.5, 0.5]]))
                }
            }
        })
        .mount(&server)
        .await;

    assert_eq!(
        client(&server).embed(&texts(&["x"])).await.unwrap(),
        vec![vec![0.5, 0.5]]
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_key_is_upstream_auth_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    match client(&server).embed(&texts(&["test"])).await {
        Err(err @ ChainRagError::ApiAuth(_)) => {
            assert!(err.to_string().contains("bad key"));
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
        }
        other => panic!("expected ApiAuth, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unknown model"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).embed(&texts(&["test"])).await;
    assert!(matches!(result, Err(ChainRagError::Embedding(m)) if m.contains("unknown model")));
}

#[tokio::test]
async fn test_timeout_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(embedding_response(vec![vec![0.1, 0.2]]))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ApiConfig {
        timeout_secs: 1,
        ..test_config(&server.uri())
    };
    let client = EmbeddingApiClient::new(config, DIMS).unwrap();
    let result = client.embed(&texts(&["slow"])).await;
    assert!(matches!(result, Err(ChainRagError::UpstreamTimeout(_))));
}

#[tokio::test]
async fn test_provider_batches_documents() {
    let server = MockServer::start().await;
    let requests = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with({
            let requests = Arc::clone(&requests);
            move |req: &wiremock::Request| {
                requests.fetch_add(1, Ordering::SeqCst);
                let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
                let n = body["input"].as_array().map(|a| a.len()).unwrap_or(0);
                ResponseTemplate::new(200)
                    .set_body_json(embedding_response(vec![vec![1.0, 0.0]; n]))
            }
        })
        .mount(&server)
        .await;

    let provider = EmbeddingProvider::from_api(test_config(&server.uri()), DIMS, 2).unwrap();
    let result = provider
        .embed_documents(texts(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert_eq!(requests.load(Ordering::SeqCst), 3);
    assert_eq!(provider.model_name(), "text-embedding-3-small");
}

#[tokio::test]
async fn test_provider_empty_documents_make_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let provider = EmbeddingProvider::from_api(test_config(&server.uri()), DIMS, 8).unwrap();
    assert!(provider.embed_documents(Vec::new()).await.unwrap().is_empty());
}
