use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::services::auth::Identity;

/// The caller's [`Identity`] if the authentication middleware attached one.
///
/// Public operations never run that middleware, so absence is not an error
/// here; authorization has already rejected callers that needed one.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}
