//! Error Types for the Recap API
//!
//! This module defines error handling for the API layer:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recap_core::{RecapError, StoreError};
use serde::{Deserialize, Serialize};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request validation failed
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// The shared store is unreachable
    StoreUnavailable,

    /// An upstream dependency rejected the request
    UpstreamFailed,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Map this error code to its HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::MissingField => StatusCode::BAD_REQUEST,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::UpstreamFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// API ERROR
// ============================================================================

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { .. } => Self::new(ErrorCode::StoreUnavailable, err.to_string()),
            _ => Self::new(ErrorCode::InternalError, err.to_string()),
        }
    }
}

impl From<RecapError> for ApiError {
    fn from(err: RecapError) -> Self {
        match err {
            RecapError::Store(store) => store.into(),
            RecapError::Classify(_) | RecapError::Scm(_) => {
                Self::new(ErrorCode::UpstreamFailed, err.to_string())
            }
            RecapError::Config(_) => Self::new(ErrorCode::InternalError, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "request failed");
        }
        (status, Json(self)).into_response()
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::MissingField.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::StoreUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ErrorCode::UpstreamFailed.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_unavailable_maps_to_503() {
        let api_err: ApiError = StoreError::Unavailable {
            reason: "down".to_string(),
        }
        .into();
        assert_eq!(api_err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_recap_scm_error_maps_to_502() {
        let api_err: ApiError = RecapError::Scm(recap_core::ScmError::Timeout {
            host: "api.github.com".to_string(),
        })
        .into();
        assert_eq!(api_err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_serializes_with_screaming_code() {
        let err = ApiError::invalid_input("bad range");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("INVALID_INPUT"));
        assert!(json.contains("bad range"));
    }
}
