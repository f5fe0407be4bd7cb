/*
 * Responsibility
 * - Request-scoped values handlers receive from middleware (request extensions)
 */
mod identity;

pub use identity::MaybeIdentity;
