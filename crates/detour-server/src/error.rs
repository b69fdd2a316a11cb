//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use detour_storage::StorageError;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Settings write without a valid API token.
    #[error("missing or invalid API token")]
    Unauthorized,

    /// Request from a web page rather than the extension.
    #[error("requests from this origin are not accepted")]
    ForeignOrigin,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::ForeignOrigin => (StatusCode::FORBIDDEN, "forbidden_origin"),
            ApiError::Storage(StorageError::IndexOutOfRange { .. }) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Storage(StorageError::CorruptSetting { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_setting")
            }
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
