//! Application error handling
//!
//! This module provides unified error handling for the API, converting
//! internal errors to appropriate HTTP responses. Authentication rejections
//! reach this layer already collapsed to a generic `Unauthorized`; code
//! confirmation failures stay distinct because the caller's next action
//! differs (resend vs. retype).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;
use whisperbox_shared::types::{ErrorDetail, ErrorResponse};

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Verification code expired")]
    CodeExpired,

    #[error("Verification code mismatch")]
    CodeMismatch,

    #[error("Verification email could not be sent")]
    Delivery,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::CodeExpired => (
                StatusCode::BAD_REQUEST,
                "CODE_EXPIRED",
                "Verification code has expired, request a new one".to_string(),
            ),
            ApiError::CodeMismatch => (
                StatusCode::BAD_REQUEST,
                "CODE_MISMATCH",
                "Incorrect verification code".to_string(),
            ),
            ApiError::Delivery => (
                StatusCode::BAD_GATEWAY,
                "EMAIL_DELIVERY_FAILED",
                "Verification email could not be sent".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Database(err) => {
                error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field: None,
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
