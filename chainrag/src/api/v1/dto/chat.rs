//! Chat request/response DTOs.

use serde::{Deserialize, Serialize};

use crate::services::ChatAnswer;

/// Request body for `POST /api/v1/chat`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    pub query: String,
    /// Tag returned by `POST /api/v1/prepare`. Raw account strings are
    /// normalized the same way.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub answer: String,
    /// Texts of the transaction documents the answer was grounded on, in
    /// retrieval order.
    pub sources: Vec<String>,
}

impl From<ChatAnswer> for ChatResponse {
    fn from(answer: ChatAnswer) -> Self {
        Self {
            answer: answer.answer,
            sources: answer.sources,
        }
    }
}
