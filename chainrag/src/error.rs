use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainRagError {
    #[error("No prepared index for tag '{0}'; trigger preparation first")]
    NotPrepared(String),

    #[error("Failed to load index for tag '{tag}': {reason}")]
    IndexLoad { tag: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Build error: {0}")]
    Build(String),

    #[error("Etherscan error: {0}")]
    Etherscan(String),

    #[error("Upstream call timed out: {0}")]
    UpstreamTimeout(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },
}

impl ChainRagError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChainRagError::NotPrepared(_) => StatusCode::NOT_FOUND,
            ChainRagError::IndexLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ChainRagError::Validation(_) => StatusCode::BAD_REQUEST,
            ChainRagError::Embedding(_) => StatusCode::BAD_GATEWAY,
            ChainRagError::Build(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChainRagError::Etherscan(_) => StatusCode::BAD_GATEWAY,
            ChainRagError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ChainRagError::Http(_) => StatusCode::BAD_GATEWAY,
            ChainRagError::Json(_) => StatusCode::BAD_REQUEST,
            ChainRagError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChainRagError::ApiRateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            // The caller is authenticated fine; it is our upstream credential that failed.
            ChainRagError::ApiAuth(_) => StatusCode::BAD_GATEWAY,
            ChainRagError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChainRagError::Llm(_) => StatusCode::BAD_GATEWAY,
            ChainRagError::LlmUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChainRagError::LlmRateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ChainRagError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ChainRagError::Validation(msg)
            | ChainRagError::Embedding(msg)
            | ChainRagError::Llm(msg)
            | ChainRagError::LlmUnavailable(msg)
            | ChainRagError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ChainRagError>;
