/*
 * Responsibility
 * - Unmatched path -> 404 envelope, unmatched method -> 405 envelope
 * - OriginalUri keeps the /api/v1 prefix inside nested routers
 */
use axum::{extract::OriginalUri, http::Method};

use crate::error::AppError;

pub async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

pub async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::MethodNotAllowed(format!("{method} {}", uri.path()))
}
