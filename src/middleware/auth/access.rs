//! Authentication middleware: `Authorization: Bearer <token>` ->
//! [`Identity`](crate::services::auth::Identity) in request extensions.
//!
//! Every rejection kind becomes the same 401; only the log says which one.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = match state.authn.authenticate_headers(req.headers()).await {
        Ok(identity) => identity,
        Err(rejection) => {
            tracing::warn!(
                reason = rejection.kind(),
                method = %req.method(),
                path = %req.uri().path(),
                "authentication failed"
            );
            return Err(AppError::Unauthorized);
        }
    };

    // middleware -> extractor (MaybeIdentity) / authorization middleware
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
