use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::llm::LlmBackend;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub embeddings: EmbeddingsStatus,
    pub llm: LlmStatus,
    pub cache: CacheStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EmbeddingsStatus {
    pub status: String,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CacheStatus {
    /// Number of indices currently held in memory.
    pub loaded: usize,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthData> {
    let embeddings_status = EmbeddingsStatus {
        status: "ok".to_string(),
        model: state.embeddings.model_name().to_string(),
        dimensions: state.embeddings.dimensions(),
    };

    let llm_status = match provider_label(state.llm.backend()) {
        Ok(provider) => LlmStatus {
            status: "available".to_string(),
            provider: Some(provider.to_string()),
            model: state.llm.config().map(|c| c.model.clone()),
            reason: None,
        },
        Err(reason) => LlmStatus {
            status: "unavailable".to_string(),
            provider: None,
            model: None,
            reason: Some(reason.to_string()),
        },
    };

    Json(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        embeddings: embeddings_status,
        llm: llm_status,
        cache: CacheStatus {
            loaded: state.cache.len(),
        },
    })
}

/// Provider name reported by health, or the reason the backend is unusable.
fn provider_label(backend: &LlmBackend) -> Result<&'static str, &str> {
    match backend {
        LlmBackend::OpenAI => Ok("openai"),
        LlmBackend::OpenRouter => Ok("openrouter"),
        LlmBackend::Ollama => Ok("ollama"),
        LlmBackend::LmStudio => Ok("lmstudio"),
        LlmBackend::OpenAICompatible { .. } => Ok("openai-compatible"),
        LlmBackend::Unavailable { reason } => Err(reason),
    }
}
