use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ChainRagError, Result};

pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "https://api.openai.com/v1",
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

enum Failure {
    Retry(ChainRagError),
    Fatal(ChainRagError),
}

/// `/embeddings` client whose replies are checked against the index width.
///
/// Every returned vector must have `dimensions` components and there must be
/// exactly one per input, in input order. A reply that breaks either rule is
/// an error.
#[derive(Clone)]
pub struct EmbeddingApiClient {
    client: Client,
    url: String,
    config: ApiConfig,
    dimensions: usize,
}

impl EmbeddingApiClient {
    pub fn new(config: ApiConfig, dimensions: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChainRagError::Embedding(format!("Failed to create HTTP client: {e}")))?;
        let url = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            url,
            config,
            dimensions,
        })
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        };

        let mut attempt = 0;
        loop {
            let error = match self.send(&request).await {
                Ok(response) => {
                    let body: EmbeddingResponse = response.json().await.map_err(|e| {
                        ChainRagError::Embedding(format!("Unreadable embeddings reply: {e}"))
                    })?;
                    return self.check(body.data, texts.len());
                }
                Err(Failure::Retry(error)) if attempt < self.config.max_retries => error,
                Err(Failure::Retry(error) | Failure::Fatal(error)) => return Err(error),
            };

            attempt += 1;
            tracing::debug!(attempt, error = %error, "Retrying embeddings request");
            tokio::time::sleep(Duration::from_millis(100 << (attempt - 1))).await;
        }
    }

    /// One request. Rate limits, transport errors and 5xx replies are worth
    /// retrying; timeouts and other statuses are not.
    async fn send(&self, request: &EmbeddingRequest<'_>) -> std::result::Result<Response, Failure> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Failure::Fatal(ChainRagError::UpstreamTimeout(format!(
                    "Embedding request timed out: {e}"
                )))
            } else {
                Failure::Retry(ChainRagError::Embedding(format!("Embedding request failed: {e}")))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(Failure::Retry(ChainRagError::ApiRateLimit { retry_after }));
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            s if s == StatusCode::UNAUTHORIZED || s == StatusCode::FORBIDDEN => Failure::Fatal(
                ChainRagError::ApiAuth(format!("Embedding provider rejected credentials: {body}")),
            ),
            s if s.is_server_error() => Failure::Retry(ChainRagError::Embedding(format!(
                "Embedding provider error {s}: {body}"
            ))),
            s => Failure::Fatal(ChainRagError::Embedding(format!(
                "Embedding request rejected with {s}: {body}"
            ))),
        })
    }

    fn check(&self, mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
        if data.len() != expected {
            return Err(ChainRagError::Embedding(format!(
                "Expected {expected} embeddings, got {}",
                data.len()
            )));
        }

        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }

        if let Some(bad) = data
            .iter()
            .find(|d| self.dimensions > 0 && d.embedding.len() != self.dimensions)
        {
            return Err(ChainRagError::Embedding(format!(
                "Model {} returned {}-dimensional vectors, index expects {}",
                self.config.model,
                bad.embedding.len(),
                self.dimensions
            )));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
