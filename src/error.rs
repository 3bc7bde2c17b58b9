//! Error types and Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error types.
///
/// Challenge parsing and signature verification failures are recovered
/// into these variants close to where they happen; only storage-layer
/// faults surface as 5xx responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed challenge: {0}")]
    MalformedChallenge(String),

    #[error("Domain mismatch: {0}")]
    DomainMismatch(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Host rejected: {0}")]
    HostRejected(String),

    #[error("Rate limited")]
    RateLimited,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage fault");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage fault".to_string())
            }
            AppError::MalformedChallenge(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DomainMismatch(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::SignatureInvalid => (
                StatusCode::FORBIDDEN,
                "Signature verification failed".to_string(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::HostRejected(msg) => {
                tracing::error!(error = %msg, "Request arrived on an unconfigured hostname");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// Convenience conversions from common error types
impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Storage(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}
