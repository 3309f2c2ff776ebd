//! Preparation request/response DTOs.

use serde::{Deserialize, Serialize};

use crate::models::JobStatus;
use crate::tag::Tag;

/// Request body for `POST /api/v1/prepare`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct PrepareRequest {
    /// Account address (or any label; it is normalized into the tag).
    pub account: String,
    /// Rebuild even when a finished index already exists.
    #[serde(default)]
    pub refresh: Option<bool>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PrepareResponse {
    /// Normalized tag to use for status polling and chat.
    #[schema(value_type = String)]
    pub tag: Tag,
    pub status: JobStatus,
}
