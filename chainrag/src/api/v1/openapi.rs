use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ChainRAG API",
        version = "1.0.0",
        description = "Ask natural-language questions about an Ethereum account's transaction history.",
    ),
    paths(
        handlers::health::health_check,
        handlers::prepare::trigger_preparation,
        handlers::prepare::get_preparation_status,
        handlers::chat::chat,
    ),
    components(schemas(
        handlers::health::HealthData,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
        handlers::health::CacheStatus,
        dto::ErrorBody,
        dto::PrepareRequest,
        dto::PrepareResponse,
        dto::ChatRequest,
        dto::ChatResponse,
        models::JobState,
        models::JobStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "prepare", description = "Per-account index preparation and status polling"),
        (name = "chat", description = "Question answering over a prepared account"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
