//! v1 Preparation handlers.
//!
//! Preparation is asynchronous: `POST` returns as soon as the job is
//! registered and clients poll `GET /prepare/{tag}` until `done` or `error`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::v1::dto::{ErrorBody, PrepareRequest, PrepareResponse};
use crate::api::AppState;
use crate::error::{ChainRagError, Result};
use crate::tag::Tag;

/// `POST /api/v1/prepare`
///
/// Returns 202 when a build was started or is still running, 200 when the
/// existing finished index is returned unchanged.
#[utoipa::path(
    post,
    path = "/api/v1/prepare",
    tag = "prepare",
    operation_id = "prepare.trigger",
    request_body = PrepareRequest,
    responses(
        (status = 202, description = "Preparation queued or in progress", body = PrepareResponse),
        (status = 200, description = "Index already prepared", body = PrepareResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
    )
)]
pub async fn trigger_preparation(
    State(state): State<AppState>,
    Json(req): Json<PrepareRequest>,
) -> Result<(StatusCode, Json<PrepareResponse>)> {
    let account = req.account.trim();
    if account.is_empty() {
        return Err(ChainRagError::Validation(
            "Account must not be empty".to_string(),
        ));
    }

    let tag = Tag::normalize(account);
    let status = state
        .jobs
        .trigger(&tag, account, req.refresh.unwrap_or(false));

    let code = if status.state.is_in_flight() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };

    Ok((code, Json(PrepareResponse { tag, status })))
}

/// `GET /api/v1/prepare/{tag}`
#[utoipa::path(
    get,
    path = "/api/v1/prepare/{tag}",
    tag = "prepare",
    operation_id = "prepare.status",
    params(
        ("tag" = String, Path, description = "Tag or raw account identifier")
    ),
    responses(
        (status = 200, description = "Current preparation status", body = PrepareResponse),
    )
)]
pub async fn get_preparation_status(
    State(state): State<AppState>,
    Path(raw_tag): Path<String>,
) -> Json<PrepareResponse> {
    let tag = Tag::normalize(&raw_tag);
    let status = state.jobs.status(&tag);
    Json(PrepareResponse { tag, status })
}
