use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Header, Validation};
use tracing::error;

use crate::services::auth::claims::{Claims, RawClaims, TokenSubject, first_blank_claim};
use crate::services::auth::keys::KeyMaterial;

/// Issuer stamped into every token unless configured otherwise.
pub const DEFAULT_ISSUER: &str = "shop-platform";

/// Token signing/verification failures.
///
/// `verify` only ever returns the first four variants. The remaining ones are
/// configuration errors raised while building or using the signing side.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    SignatureInvalid,
    #[error("malformed token")]
    MalformedFormat,
    #[error("claim mismatch: {0}")]
    ClaimMismatch(String),

    #[error("signing key unavailable")]
    KeyUnavailable,
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl TokenError {
    /// Short, stable name used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::SignatureInvalid => "signature_invalid",
            Self::MalformedFormat => "malformed_format",
            Self::ClaimMismatch(_) => "claim_mismatch",
            Self::KeyUnavailable => "key_unavailable",
            Self::InvalidKey(_) => "invalid_key",
            Self::Signing(_) => "signing_failed",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            // A header naming another algorithm cannot be checked against our key.
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::SignatureInvalid,
            ErrorKind::InvalidIssuer => Self::ClaimMismatch("iss".to_string()),
            ErrorKind::MissingRequiredClaim(claim) => Self::ClaimMismatch(claim.clone()),
            ErrorKind::ImmatureSignature => Self::ClaimMismatch("nbf".to_string()),
            ErrorKind::InvalidAudience => Self::ClaimMismatch("aud".to_string()),
            _ => Self::MalformedFormat,
        }
    }
}

/// Upper bound on clock-skew tolerance; larger values are clamped.
pub const MAX_LEEWAY_SECONDS: u64 = 3600;

/// Header and claims of a token decoded without any verification.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    pub header: Header,
    pub claims: RawClaims,
}

/// Signs and verifies access tokens with one immutable [`KeyMaterial`].
#[derive(Debug, Clone)]
pub struct TokenService {
    keys: KeyMaterial,
    issuer: String,
    leeway_seconds: i64,
    validation: Validation,
}

impl TokenService {
    pub fn new(keys: KeyMaterial, issuer: impl Into<String>, leeway_seconds: u64) -> Self {
        let issuer = issuer.into();
        let leeway_seconds = leeway_seconds.min(MAX_LEEWAY_SECONDS);

        let mut validation = Validation::new(keys.algorithm().jwt_algorithm());
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_aud = false;
        validation.leeway = leeway_seconds;

        Self {
            keys,
            issuer,
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
            validation,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn can_sign(&self) -> bool {
        self.keys.can_sign()
    }

    /// Mint a token for `subject` valid for `ttl_seconds` (may be <= 0, which
    /// yields an already expired token).
    pub fn sign(&self, subject: &TokenSubject, ttl_seconds: i64) -> Result<String, TokenError> {
        let encoding_key = self.keys.encoding_key().ok_or(TokenError::KeyUnavailable)?;

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: subject.id.clone(),
            email: subject.email.clone(),
            role: subject.role.clone(),
            iat: now,
            exp: now.saturating_add(ttl_seconds),
            iss: self.issuer.clone(),
        };

        let raw = RawClaims {
            sub: Some(claims.sub.clone()),
            email: Some(claims.email.clone()),
            role: Some(claims.role.clone()),
            iat: Some(claims.iat),
            exp: Some(claims.exp),
            iss: Some(claims.iss.clone()),
        };
        if let Some(claim) = first_blank_claim(&raw) {
            return Err(TokenError::ClaimMismatch(claim.to_string()));
        }

        let header = Header::new(self.keys.algorithm().jwt_algorithm());
        jsonwebtoken::encode(&header, &claims, encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign access token");
            TokenError::Signing(e.to_string())
        })
    }

    /// Verify signature, issuer and expiry, then require subject/email/role.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<RawClaims>(
            token,
            self.keys.decoding_key(),
            &self.validation,
        )?;
        let raw = data.claims;

        if let Some(claim) = first_blank_claim(&raw) {
            return Err(TokenError::ClaimMismatch(claim.to_string()));
        }

        let (Some(sub), Some(email), Some(role), Some(exp), Some(iss)) =
            (raw.sub, raw.email, raw.role, raw.exp, raw.iss)
        else {
            return Err(TokenError::MalformedFormat);
        };

        if iss != self.issuer {
            return Err(TokenError::ClaimMismatch("iss".to_string()));
        }

        // jsonwebtoken accepts `exp == now`; a token is dead at its expiry second.
        let now = chrono::Utc::now().timestamp();
        if exp.saturating_add(self.leeway_seconds) <= now {
            return Err(TokenError::Expired);
        }

        Ok(Claims {
            sub,
            email,
            role,
            iat: raw.iat.unwrap_or_default(),
            exp,
            iss,
        })
    }

    /// Decode header and claims WITHOUT verifying anything.
    ///
    /// Diagnostics only. Never authorize a request from this output.
    pub fn decode_unsafe(token: &str) -> Result<UnverifiedToken, TokenError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|_| TokenError::MalformedFormat)?;

        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(TokenError::MalformedFormat),
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::MalformedFormat)?;
        let claims =
            serde_json::from_slice::<RawClaims>(&bytes).map_err(|_| TokenError::MalformedFormat)?;

        Ok(UnverifiedToken { header, claims })
    }
}
