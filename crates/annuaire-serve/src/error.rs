//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API error with HTTP status code
#[derive(Debug, Clone, Serialize, Error)]
pub struct ApiError {
    /// HTTP status code
    #[serde(skip)]
    pub status: StatusCode,

    /// Error message
    pub message: String,

    /// Optional error code for client handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    /// Create a new API error with code
    pub fn with_code(
        status: StatusCode,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// 400 Bad Request for a malformed query parameter
    pub fn invalid_parameter(name: &str, value: &str) -> Self {
        Self::with_code(
            StatusCode::BAD_REQUEST,
            format!("Invalid value for '{}': {}", name, value),
            "INVALID_PARAMETER",
        )
    }

    /// 401 Unauthorized
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// 403 Forbidden
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::FORBIDDEN, message, "FORBIDDEN")
    }

    /// 404 Not Found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::NOT_FOUND,
            format!("Resource not found: {}", resource.into()),
            "NOT_FOUND",
        )
    }

    /// 422 Unprocessable Entity
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::UNPROCESSABLE_ENTITY,
            message,
            "VALIDATION_ERROR",
        )
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_ERROR",
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{:?}] [{}] {}", self.status, code, self.message),
            None => write!(f, "[{:?}] {}", self.status, self.message),
        }
    }
}

impl From<annuaire_recherche::Error> for ApiError {
    fn from(err: annuaire_recherche::Error) -> Self {
        match err {
            annuaire_recherche::Error::InvalidTopK(k) => {
                Self::validation(format!("top_k must be at least 1, got {}", k))
            }
            annuaire_recherche::Error::Store(e) => {
                error!("Store failure during search: {}", e);
                Self::internal("Storage error")
            }
            annuaire_recherche::Error::LockPoisoned(e) => {
                error!("Search index lock poisoned: {}", e);
                Self::internal("Search index unavailable")
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Blocking task failed: {}", err);
        Self::internal("Background task failed")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        }));

        (self.status, body).into_response()
    }
}
