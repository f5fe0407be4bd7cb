//! Authentication: bearer credential -> verified [`Identity`].
//!
//! The guard walks `extract -> verify -> validate claims -> secondary check`
//! and stops at the first failure. Callers only ever learn "unauthorized";
//! [`AuthRejection::kind`] exists for logs.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use axum::http::{HeaderMap, header};

use crate::services::auth::claims::{Claims, Identity};
use crate::services::auth::token_service::{TokenError, TokenService};
use crate::services::dispatch::MessageEnvelope;

/// Secondary check supplied by the hosting service, e.g. "account still active".
///
/// Runs only after the token verified. Returning `false` rejects the request
/// exactly like a bad token.
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    async fn validate(&self, identity: &Identity) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    #[error("missing credential")]
    MissingCredential,
    #[error("malformed credential")]
    MalformedCredential,
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("identity rejected by secondary validation")]
    ValidationFailed,
}

impl AuthRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::Token(e) => e.kind(),
            Self::ValidationFailed => "validation_failed",
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` value.
///
/// The scheme is case-insensitive; anything but exactly one non-empty token
/// after it is malformed.
pub fn extract_bearer(value: Option<&str>) -> Result<&str, AuthRejection> {
    let value = value.ok_or(AuthRejection::MissingCredential)?.trim();
    if value.is_empty() {
        return Err(AuthRejection::MissingCredential);
    }

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthRejection::MalformedCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthRejection::MalformedCredential);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthRejection::MalformedCredential);
    }

    Ok(token)
}

#[derive(Clone)]
pub struct AuthenticationGuard {
    tokens: Arc<TokenService>,
    validator: Option<Arc<dyn IdentityValidator>>,
}

impl fmt::Debug for AuthenticationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationGuard")
            .field("tokens", &self.tokens)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl AuthenticationGuard {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self {
            tokens,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn IdentityValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Authenticate a raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Identity, AuthRejection> {
        // TokenService is never reached without a well-formed bearer credential.
        let token = extract_bearer(authorization)?;
        let claims = self.tokens.verify(token)?;
        let identity = identity_from_claims(&claims)?;

        if let Some(validator) = &self.validator {
            if !validator.validate(&identity).await {
                return Err(AuthRejection::ValidationFailed);
            }
        }

        Ok(identity)
    }

    /// Authenticate an HTTP request by its `Authorization` header.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Identity, AuthRejection> {
        let value = match headers.get(header::AUTHORIZATION) {
            Some(v) => Some(v.to_str().map_err(|_| AuthRejection::MalformedCredential)?),
            None => None,
        };
        self.authenticate(value).await
    }

    /// Authenticate an internal message by its `authorization` header field.
    pub async fn authenticate_envelope(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<Identity, AuthRejection> {
        self.authenticate(envelope.authorization()).await
    }
}

fn identity_from_claims(claims: &Claims) -> Result<Identity, AuthRejection> {
    let identity = claims.identity();
    for (name, value) in [
        ("sub", &identity.id),
        ("email", &identity.email),
        ("role", &identity.role),
    ] {
        if value.trim().is_empty() {
            return Err(TokenError::ClaimMismatch(name.to_string()).into());
        }
    }
    Ok(identity)
}
