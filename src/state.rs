/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 * - Everything inside is built once at startup and read-only afterwards;
 *   Clone is cheap (Arc)
 */
use std::sync::Arc;

use crate::services::auth::{AuthenticationGuard, AuthorizationGuard};
use crate::services::dispatch::RequestDispatcher;
use crate::services::errors::ErrorTranslator;

#[derive(Clone, Debug)]
pub struct AppState {
    pub authn: AuthenticationGuard,
    pub authz: AuthorizationGuard,
    pub dispatcher: Arc<RequestDispatcher>,
    pub translator: Arc<ErrorTranslator>,
}

impl AppState {
    pub fn new(
        authn: AuthenticationGuard,
        authz: AuthorizationGuard,
        dispatcher: RequestDispatcher,
        translator: ErrorTranslator,
    ) -> Self {
        Self {
            authn,
            authz,
            dispatcher: Arc::new(dispatcher),
            translator: Arc::new(translator),
        }
    }
}
