/*
 * Responsibility
 * - Load Config -> build process-wide services -> assemble the Router
 * - Startup checks: keys must load, every operation must be routable
 * - Apply HTTP middleware and serve with axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::fallback::{method_not_allowed, not_found};
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::middleware;
use crate::services::auth::{
    AuthenticationGuard, AuthorizationGuard, KeyMaterial, TokenService,
};
use crate::services::dispatch::{RequestDispatcher, RouteTable};
use crate::services::errors::ErrorTranslator;
use crate::services::transport::{Transport, ValkeyTransport};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,shop_gateway=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing; stderr may not be collected.
        tracing::error!(?info, "panic");

        // Development fails fast; production keeps serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting gateway in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let transport = ValkeyTransport::connect(&config.transport_url)
        .await
        .with_context(|| format!("connecting to transport at {}", config.transport_url))?;

    let state = build_state(&config, Arc::new(transport))?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the process-wide services and inject them into the shared state.
///
/// Fails (and the process must not serve) on unusable key material or an
/// operation whose service has no route.
pub fn build_state(config: &Config, transport: Arc<dyn Transport>) -> Result<AppState> {
    let keys = KeyMaterial::from_pem(
        config.auth_algorithm,
        &config.access_jwt_public_key_pem,
        config.access_jwt_private_key_pem.as_deref(),
    )
    .context("loading access token keys")?;
    tracing::info!(
        algorithm = %keys.algorithm(),
        signing = keys.can_sign(),
        issuer = %config.auth_issuer,
        "token keys loaded"
    );

    let tokens = Arc::new(TokenService::new(
        keys,
        config.auth_issuer.clone(),
        config.access_token_leeway_seconds,
    ));
    let authn = AuthenticationGuard::new(tokens);
    let authz = AuthorizationGuard::new(Arc::new(api::v1::role_requirements()));

    let routes = RouteTable::defaults().with_overrides(&config.service_routes);
    for op in api::v1::operations() {
        routes
            .ensure_serves(op.service, op.id)
            .with_context(|| format!("operation {} {}", op.id, op.path))?;
    }
    for entry in routes.entries() {
        tracing::debug!(service = %entry.service_id, address = %entry.address, "route");
    }

    let dispatcher = RequestDispatcher::new(Arc::new(routes), transport, config.dispatch);

    Ok(AppState::new(
        authn,
        authz,
        dispatcher,
        ErrorTranslator::default(),
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state);

    middleware::http::apply(router, config)
}
