pub mod authn;
pub mod authz;
pub mod claims;
pub mod keys;
pub mod token_service;

pub use authn::{AuthRejection, AuthenticationGuard, IdentityValidator, extract_bearer};
pub use authz::{AccessDenied, AuthorizationGuard, RoleRequirements, roles};
pub use claims::{Claims, Identity, TokenSubject};
pub use keys::{KeyAlgorithm, KeyMaterial};
pub use token_service::{
    DEFAULT_ISSUER, MAX_LEEWAY_SECONDS, TokenError, TokenService, UnverifiedToken,
};
