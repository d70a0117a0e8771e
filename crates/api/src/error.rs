//! API error handling
//!
//! Consistent JSON error responses across all endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Structured JSON error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// API error type that converts to JSON responses
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request or activity
    Validation(String),
    /// Resource not found
    NotFound(String),
    /// Request conflicts with current state
    Conflict(String),
    InsufficientState(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl From<common::Error> for ApiError {
    fn from(e: common::Error) -> Self {
        match e {
            common::Error::Validation(msg) => ApiError::Validation(msg),
            common::Error::NotFound(msg) => ApiError::NotFound(msg),
            common::Error::Conflict(msg) => ApiError::Conflict(msg),
            common::Error::InsufficientState(msg) => ApiError::InsufficientState(msg),
            common::Error::Database(msg) => ApiError::Database(msg),
            common::Error::Config(msg) | common::Error::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, response) = match self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    code: "validation_error",
                },
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: msg,
                    code: "not_found",
                },
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: msg,
                    code: "conflict",
                },
            ),
            ApiError::InsufficientState(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: msg,
                    code: "insufficient_state",
                },
            ),
            ApiError::Database(msg) => {
                error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database error".to_string(),
                        code: "database_error",
                    },
                )
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal server error".to_string(),
                        code: "internal_error",
                    },
                )
            }
        };

        (status, Json(response)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Extension trait to convert sqlx errors to ApiError
pub trait DbResultExt<T> {
    fn db_err(self) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> DbResultExt<T> for Result<T, E> {
    fn db_err(self) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::Database(e.to_string()))
    }
}

/// Extension trait to convert Option to NotFound
pub trait OptionExt<T> {
    fn not_found(self, resource: impl Into<String>) -> Result<T, ApiError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn not_found(self, resource: impl Into<String>) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::NotFound(resource.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: common::Error) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(status(common::Error::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(common::Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(common::Error::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(common::Error::InsufficientState("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(common::Error::Database("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(common::Error::Config("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
