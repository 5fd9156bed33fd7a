//! Request-level error taxonomy and its mapping to HTTP responses.
//!
//! Three kinds only: missing required fields (400), absent capture file
//! (404), everything else (500).  Analyzer and formatter failures never
//! surface here; they degrade inside the pipeline instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("required fields are missing (timestamp, url, html_content)")]
    MissingFields { received: Vec<String> },
    #[error("capture file not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingFields { received } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "required fields are missing (timestamp, url, html_content)",
                    "received_fields": received,
                })),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "success": false,
                    "message": "capture file not found",
                })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!("Request failed: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "internal server error",
                        "error": format!("{e:#}"),
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl ApiError {
    /// Status this error maps to; handler tests assert on it without
    /// rendering a response body.
    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
