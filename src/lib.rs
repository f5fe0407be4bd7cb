/*
 * Responsibility
 * - Library root: the gateway (api/middleware/app) and the transport-agnostic
 *   core (services) that backend services embed as well
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(test)]
mod testutil;
