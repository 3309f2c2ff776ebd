use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let account_routes = Router::new()
        .route("/prepare", post(handlers::prepare::trigger_preparation))
        .route(
            "/prepare/{tag}",
            get(handlers::prepare::get_preparation_status),
        )
        .route("/chat", post(handlers::chat::chat));

    Router::new().merge(public_routes).merge(account_routes)
}
