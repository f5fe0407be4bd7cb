/*
 * Responsibility
 * - Transport-agnostic core: identity (auth), call dispatch, error translation
 * - HTTP/axum specifics stay in api/ and middleware/
 */
pub mod auth;
pub mod dispatch;
pub mod errors;
pub mod internal;
pub mod transport;
