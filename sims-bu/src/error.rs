//! Error types for sims-bu

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sims_common::submit::SubmitError;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. a submission for the batch is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Submission refused or failed
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sims_common::Error> for ApiError {
    fn from(err: sims_common::Error) -> Self {
        match err {
            sims_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            sims_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, positions) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
                None,
            ),
            ApiError::Submit(ref err) => {
                let message = err.operator_message();
                match err {
                    SubmitError::Validation { positions } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "INVALID_ROWS",
                        message,
                        Some(positions.clone()),
                    ),
                    SubmitError::EmptyBatch => {
                        (StatusCode::BAD_REQUEST, "EMPTY_BATCH", message, None)
                    }
                    SubmitError::Upstream(_) => {
                        (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILED", message, None)
                    }
                    SubmitError::Encode(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        message,
                        None,
                    ),
                }
            }
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(positions) = positions {
            error["positions"] = json!(positions);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
