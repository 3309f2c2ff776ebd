use serde::{Deserialize, Serialize};

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human readable cause.
    pub error: String,
    /// HTTP status code, repeated in the body.
    pub code: u16,
}
