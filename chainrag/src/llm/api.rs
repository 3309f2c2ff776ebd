use std::time::Duration;

use serde_json::Value;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
    Client,
};

use crate::{
    config::{parse_provider_model, LlmConfig},
    error::{ChainRagError, Result},
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

/// Chat-completions client used for intent extraction and answer synthesis.
///
/// Each call sends a single user message at the configured temperature.
/// Timeouts, rate limits and rejected credentials fail immediately; other
/// server-side failures are retried up to `max_retries` times.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

/// Outcome of a failed completion attempt.
enum Failure {
    Retry(ChainRagError),
    Fatal(ChainRagError),
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let (provider, model) = parse_provider_model(&config.model);
        let provider = provider.to_lowercase();

        let local = matches!(provider.as_str(), "ollama" | "local" | "lmstudio");
        if !local && config.api_key.is_none() {
            return Err(ChainRagError::LlmUnavailable(
                "API key required for this provider".to_string(),
            ));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&provider).to_string());

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url.clone())
            .with_api_key(config.api_key.clone().unwrap_or_default());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                ChainRagError::Llm(format!("Failed to create LLM HTTP client: {error}"))
            })?;

        // async-openai backs off on 5xx by itself; bound that by the request timeout.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(config.timeout_secs)),
            ..Default::default()
        };

        Ok(Self {
            client: Client::with_config(openai_config)
                .with_http_client(http_client)
                .with_backoff(backoff),
            base_url,
            model: model.to_string(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model name as sent upstream, without the provider prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(ChainRagError::Validation("Prompt cannot be empty".to_string()));
        }

        let mut attempt = 0;
        loop {
            let request = self.build_request(prompt)?;
            let error = match self.client.chat().create(request).await {
                Ok(response) => return extract_content(response),
                Err(error) => error,
            };

            match classify(error) {
                Failure::Retry(error) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %error, "Retrying LLM completion");
                    tokio::time::sleep(Duration::from_millis(100 << (attempt - 1))).await;
                }
                Failure::Retry(error) | Failure::Fatal(error) => return Err(error),
            }
        }
    }

    /// Complete and parse the reply as JSON. Markdown code fences around the
    /// payload are tolerated.
    pub async fn complete_json(&self, prompt: &str) -> Result<Value> {
        let content = self.complete(prompt).await?;

        serde_json::from_str(strip_code_fences(&content)).map_err(|e| {
            tracing::warn!(
                response_preview = %content.chars().take(100).collect::<String>(),
                error = %e,
                "LLM reply is not JSON"
            );
            ChainRagError::Llm(format!("Failed to parse JSON response: {e}"))
        })
    }

    fn build_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|error| ChainRagError::Validation(format!("Invalid prompt: {error}")))?;

        let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];
        CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|error| {
                ChainRagError::Validation(format!("Invalid LLM completion request: {error}"))
            })
    }
}

fn extract_content(response: CreateChatCompletionResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ChainRagError::Llm("LLM returned an empty reply".to_string()));
    }
    Ok(content)
}

fn classify(error: OpenAIError) -> Failure {
    match error {
        OpenAIError::Reqwest(error) if error.is_timeout() => Failure::Fatal(
            ChainRagError::UpstreamTimeout(format!("LLM request timed out: {error}")),
        ),
        OpenAIError::Reqwest(error) => match error.status().map(|status| status.as_u16()) {
            Some(429) => Failure::Fatal(ChainRagError::LlmRateLimit { retry_after: None }),
            Some(401 | 403) => Failure::Fatal(ChainRagError::ApiAuth(format!(
                "LLM authentication failed: {error}"
            ))),
            Some(400..=499) => {
                Failure::Fatal(ChainRagError::Llm(format!("LLM request rejected: {error}")))
            }
            _ => Failure::Retry(ChainRagError::Llm(format!("LLM request failed: {error}"))),
        },
        OpenAIError::ApiError(error) => classify_api_error(error),
        OpenAIError::JSONDeserialize(error) => {
            Failure::Fatal(ChainRagError::Llm(format!("Failed to parse LLM response: {error}")))
        }
        OpenAIError::InvalidArgument(message) => Failure::Fatal(ChainRagError::Validation(message)),
        other => Failure::Fatal(ChainRagError::Llm(other.to_string())),
    }
}

// Error bodies from OpenAI-compatible servers vary; match on any of the
// message, type and code fields.
fn classify_api_error(error: ApiError) -> Failure {
    let message = error.message.to_lowercase();
    let kind = error.r#type.as_deref().unwrap_or_default().to_lowercase();
    let code = error.code.as_deref().unwrap_or_default().to_lowercase();

    let rate_limited = message.contains("rate limit")
        || message.contains("too many requests")
        || kind.contains("rate_limit")
        || code.contains("rate_limit")
        || code == "insufficient_quota";
    if rate_limited {
        return Failure::Fatal(ChainRagError::LlmRateLimit { retry_after: None });
    }

    let unauthorized = message.contains("unauthorized")
        || message.contains("invalid api key")
        || code.contains("invalid_api_key")
        || kind.contains("authentication");
    if unauthorized {
        return Failure::Fatal(ChainRagError::ApiAuth(format!(
            "LLM authentication failed: {error}"
        )));
    }

    // Untyped errors are what async-openai reports for bare 5xx bodies.
    if error.r#type.is_none() && error.code.is_none() {
        Failure::Retry(ChainRagError::Llm(format!("LLM API error: {error}")))
    } else {
        Failure::Fatal(ChainRagError::Llm(format!("LLM API error: {error}")))
    }
}

fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "openrouter" => OPENROUTER_BASE_URL,
        "ollama" => OLLAMA_BASE_URL,
        "lmstudio" => LMSTUDIO_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
