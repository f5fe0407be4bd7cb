use serde::{Deserialize, Serialize};

/// Who a token is being minted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSubject {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TokenSubject {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: role.into(),
        }
    }
}

/// Access token claims as they travel on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// Claims as decoded from an untrusted payload.
///
/// Every field is optional so a missing claim can be reported as a claim
/// mismatch instead of a JSON error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
}

/// Verified caller context attached to one request.
///
/// Handlers never see a partially trusted identity: it is only constructed
/// from verified claims with non-empty `id`, `email` and `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Returns the name of the first required claim that is missing or blank.
pub(crate) fn first_blank_claim(claims: &RawClaims) -> Option<&'static str> {
    let blank = |v: &Option<String>| v.as_deref().map(str::trim).is_none_or(str::is_empty);

    if blank(&claims.sub) {
        Some("sub")
    } else if blank(&claims.email) {
        Some("email")
    } else if blank(&claims.role) {
        Some("role")
    } else if blank(&claims.iss) {
        Some("iss")
    } else if claims.exp.is_none() {
        Some("exp")
    } else {
        None
    }
}
