/*
 * Responsibility
 * - middleware public interface
 * - http: cross-cutting layers; auth: per-operation guards
 */
pub mod auth;
pub mod http;
