//! API error taxonomy mapped onto HTTP status codes.
//!
//! Every error body has the shape `{"error": "<message>"}`; the not-ready
//! response additionally carries the current stage so clients can keep
//! polling the progress stream.

use crate::session::Stage;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid input: missing upload, unrecognized kind, malformed JSON,
    /// hostile archive, non-integer era id.
    #[error("{0}")]
    Validation(String),

    /// Unknown session or era id.
    #[error("{0}")]
    NotFound(String),

    /// Read issued before the session reached a terminal stage.
    #[error("Processing not complete")]
    NotReady(Stage),

    /// The pipeline reached the error stage; the message is served verbatim.
    #[error("{0}")]
    Failed(String),

    /// Unexpected server fault.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn session_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Unknown session: {}", id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) | ApiError::Failed(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotReady(stage) => (
                StatusCode::TOO_EARLY,
                Json(json!({ "error": "Processing not complete", "stage": stage })),
            )
                .into_response(),
            ApiError::Internal(message) => {
                error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}
