//! Shared helpers for unit tests: PEM fixtures and ready-made token services.

use crate::services::auth::{KeyAlgorithm, KeyMaterial, TokenService, TokenSubject};

pub const PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/ed25519_private.pem");
pub const PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/ed25519_public.pem");
pub const ROGUE_PRIVATE_KEY_PEM: &str =
    include_str!("../tests/fixtures/rogue_ed25519_private.pem");
pub const ROGUE_PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/rogue_ed25519_public.pem");

pub const TEST_ISSUER: &str = "shop-platform-test";

pub fn signing_service() -> TokenService {
    let keys = KeyMaterial::from_pem(KeyAlgorithm::EdDsa, PUBLIC_KEY_PEM, Some(PRIVATE_KEY_PEM))
        .expect("fixture keys");
    TokenService::new(keys, TEST_ISSUER, 0)
}

pub fn verify_only_service() -> TokenService {
    let keys =
        KeyMaterial::from_pem(KeyAlgorithm::EdDsa, PUBLIC_KEY_PEM, None).expect("fixture key");
    TokenService::new(keys, TEST_ISSUER, 0)
}

pub fn customer() -> TokenSubject {
    TokenSubject::new("u1", "a@b.com", "CUSTOMER")
}
