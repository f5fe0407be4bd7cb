/*
 * Responsibility
 * - The HTTP-facing error type (AppError)
 * - IntoResponse: every failure leaves the gateway as an ErrorEnvelope
 * - Guard/dispatch results are converted here, once, at the boundary
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AccessDenied;
use crate::services::errors::{ErrorEnvelope, GENERIC_MESSAGE};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Deliberately carries no reason; the specific kind is only logged.
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(AccessDenied),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("request timed out")]
    Timeout,
    #[error("upstream error {}", .0.status_code)]
    Upstream(ErrorEnvelope),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn envelope(self) -> ErrorEnvelope {
        match self {
            AppError::BadRequest(message) => ErrorEnvelope::new(StatusCode::BAD_REQUEST, message),
            AppError::Unauthorized => ErrorEnvelope::new(StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::Forbidden(denied) => {
                let envelope = ErrorEnvelope::new(StatusCode::FORBIDDEN, denied.to_string());
                match denied {
                    AccessDenied::RoleMismatch { required, actual } => envelope
                        .with_details(json!({"requiredRoles": required, "actualRole": actual})),
                    AccessDenied::IdentityMissing => envelope,
                }
            }
            AppError::PayloadTooLarge => {
                ErrorEnvelope::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
            }
            AppError::NotFound(what) => {
                ErrorEnvelope::new(StatusCode::NOT_FOUND, format!("Cannot find {what}"))
            }
            AppError::MethodNotAllowed(what) => ErrorEnvelope::new(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("Cannot {what}"),
            ),
            AppError::Timeout => ErrorEnvelope::new(StatusCode::REQUEST_TIMEOUT, "Request timeout"),
            AppError::Upstream(envelope) => envelope,
            AppError::Internal => {
                ErrorEnvelope::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.envelope().into_response()
    }
}

impl From<AccessDenied> for AppError {
    fn from(e: AccessDenied) -> Self {
        AppError::Forbidden(e)
    }
}

impl From<ErrorEnvelope> for AppError {
    fn from(e: ErrorEnvelope) -> Self {
        AppError::Upstream(e)
    }
}
