/*
 * Responsibility
 * - v1 public surface: the operation table and its router
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::{Access, GatewayOperation, Verb, operations, role_requirements, routes};
