//! Authorization middleware for one operation.
//!
//! Runs after [`super::access::authenticate`] and checks the identity it
//! attached against the operation's role requirement.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{AccessDenied, Identity};
use crate::state::AppState;

pub async fn authorize(
    State((state, operation)): State<(AppState, &'static str)>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(denied) = state
        .authz
        .authorize(operation, req.extensions().get::<Identity>())
    {
        match &denied {
            // Only reachable if the layers were wired in the wrong order.
            AccessDenied::IdentityMissing => {
                tracing::error!(operation, "authorization ran without an identity")
            }
            AccessDenied::RoleMismatch { actual, .. } => {
                tracing::warn!(operation, role = %actual, "access denied")
            }
        }
        return Err(denied.into());
    }

    Ok(next.run(req).await)
}
