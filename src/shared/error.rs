//! Application Error Types
//!
//! Centralized error handling with Axum integration, plus the typed
//! rejection sent back over the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 10004, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, 10005, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10007, msg.clone()),
            AppError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, 10008, "Service unavailable".into())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse {
            code,
            message,
            errors: None,
        };

        (status, Json(body)).into_response()
    }
}

/// A rejected gateway event.
///
/// Every variant is reported to the originating connection as one
/// `error` event carrying [`GatewayError::code`]; nothing is sent to
/// other connections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Connection is already authenticated as another user")]
    AlreadyAuthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("{0}")]
    Validation(String),

    #[error("Message content exceeds {0} characters")]
    ContentTooLong(usize),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Internal error")]
    Internal(String),
}

impl GatewayError {
    /// Stable wire code for the `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Unauthenticated => "unauthenticated",
            GatewayError::AlreadyAuthenticated => "already_authenticated",
            GatewayError::InvalidToken(_) => "invalid_token",
            GatewayError::Validation(_) => "validation",
            GatewayError::ContentTooLong(_) => "content_too_long",
            GatewayError::Forbidden(_) => "forbidden",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::Malformed(_) => "malformed",
            GatewayError::Internal(_) => "internal",
        }
    }
}

impl From<AppError> for GatewayError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => GatewayError::NotFound(msg),
            AppError::BadRequest(msg) => GatewayError::BadRequest(msg),
            AppError::Unauthorized(msg) => GatewayError::InvalidToken(msg),
            AppError::Forbidden(msg) => GatewayError::Forbidden(msg),
            AppError::Validation(msg) => GatewayError::Validation(msg),
            AppError::Conflict(msg) | AppError::Unavailable(msg) | AppError::Internal(msg) => {
                tracing::error!("Gateway operation failed: {}", msg);
                GatewayError::Internal(msg)
            }
        }
    }
}
