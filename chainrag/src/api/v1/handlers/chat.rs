use axum::extract::State;
use axum::Json;

use crate::api::v1::dto::{ChatRequest, ChatResponse, ErrorBody};
use crate::api::AppState;
use crate::error::Result;

/// `POST /api/v1/chat`
///
/// Answers a question from the tag's prepared index. The tag must have
/// reached `done` at least once.
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "chat",
    operation_id = "chat.ask",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Grounded answer with its sources", body = ChatResponse),
        (status = 400, description = "Empty query", body = ErrorBody),
        (status = 404, description = "Tag has not been prepared", body = ErrorBody),
        (status = 502, description = "Upstream model failure", body = ErrorBody),
        (status = 504, description = "Upstream timeout", body = ErrorBody),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let answer = state.chat.answer(&req.query, &req.tag).await?;
    Ok(Json(answer.into()))
}
