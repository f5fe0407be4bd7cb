//! Asymmetric key material for signing and verifying access tokens.
//!
//! Loaded once at startup and never mutated afterwards. A process that only
//! holds the public key runs in verify-only mode.

use std::{fmt, str::FromStr};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use crate::services::auth::token_service::TokenError;

/// Signature algorithms accepted for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAlgorithm {
    #[default]
    EdDsa,
    Rs256,
    Es256,
}

impl KeyAlgorithm {
    pub fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::EdDsa => Algorithm::EdDSA,
            Self::Rs256 => Algorithm::RS256,
            Self::Es256 => Algorithm::ES256,
        }
    }

    fn decoding_key(self, pem: &[u8]) -> jsonwebtoken::errors::Result<DecodingKey> {
        match self {
            Self::EdDsa => DecodingKey::from_ed_pem(pem),
            Self::Rs256 => DecodingKey::from_rsa_pem(pem),
            Self::Es256 => DecodingKey::from_ec_pem(pem),
        }
    }

    fn encoding_key(self, pem: &[u8]) -> jsonwebtoken::errors::Result<EncodingKey> {
        match self {
            Self::EdDsa => EncodingKey::from_ed_pem(pem),
            Self::Rs256 => EncodingKey::from_rsa_pem(pem),
            Self::Es256 => EncodingKey::from_ec_pem(pem),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EDDSA" | "ED25519" => Ok(Self::EdDsa),
            "RS256" => Ok(Self::Rs256),
            "ES256" => Ok(Self::Es256),
            _ => Err(()),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EdDsa => "EdDSA",
            Self::Rs256 => "RS256",
            Self::Es256 => "ES256",
        };
        f.write_str(name)
    }
}

/// Public key (required) plus an optional private key.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct KeyMaterial {
    algorithm: KeyAlgorithm,
    decoding_key: DecodingKey,
    encoding_key: Option<EncodingKey>,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

impl KeyMaterial {
    /// Parse PEM-encoded keys for `algorithm`.
    ///
    /// Failing here is a startup error: the process must not serve without a
    /// usable public key.
    pub fn from_pem(
        algorithm: KeyAlgorithm,
        public_key_pem: &str,
        private_key_pem: Option<&str>,
    ) -> Result<Self, TokenError> {
        if public_key_pem.trim().is_empty() {
            return Err(TokenError::InvalidKey("public key is empty".to_string()));
        }

        let decoding_key = algorithm
            .decoding_key(public_key_pem.as_bytes())
            .map_err(|e| TokenError::InvalidKey(format!("invalid {algorithm} public key: {e}")))?;

        let encoding_key = match private_key_pem.filter(|pem| !pem.trim().is_empty()) {
            Some(pem) => Some(algorithm.encoding_key(pem.as_bytes()).map_err(|e| {
                TokenError::InvalidKey(format!("invalid {algorithm} private key: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            algorithm,
            decoding_key,
            encoding_key,
        })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn can_sign(&self) -> bool {
        self.encoding_key.is_some()
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub(crate) fn encoding_key(&self) -> Option<&EncodingKey> {
        self.encoding_key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{PRIVATE_KEY_PEM, PUBLIC_KEY_PEM};

    #[test]
    fn parses_algorithm_names() {
        assert_eq!("EdDSA".parse::<KeyAlgorithm>(), Ok(KeyAlgorithm::EdDsa));
        assert_eq!("rs256".parse::<KeyAlgorithm>(), Ok(KeyAlgorithm::Rs256));
        assert_eq!(" ES256 ".parse::<KeyAlgorithm>(), Ok(KeyAlgorithm::Es256));
        assert!("HS256".parse::<KeyAlgorithm>().is_err());
    }

    #[test]
    fn verify_only_without_private_key() {
        let keys = KeyMaterial::from_pem(KeyAlgorithm::EdDsa, PUBLIC_KEY_PEM, None).unwrap();
        assert!(!keys.can_sign());

        let keys = KeyMaterial::from_pem(KeyAlgorithm::EdDsa, PUBLIC_KEY_PEM, Some("  ")).unwrap();
        assert!(!keys.can_sign());
    }

    #[test]
    fn signing_enabled_with_private_key() {
        let keys =
            KeyMaterial::from_pem(KeyAlgorithm::EdDsa, PUBLIC_KEY_PEM, Some(PRIVATE_KEY_PEM))
                .unwrap();
        assert!(keys.can_sign());
        assert_eq!(keys.algorithm(), KeyAlgorithm::EdDsa);
    }

    #[test]
    fn rejects_missing_or_garbage_public_key() {
        assert!(matches!(
            KeyMaterial::from_pem(KeyAlgorithm::EdDsa, "", None),
            Err(TokenError::InvalidKey(_))
        ));
        assert!(matches!(
            KeyMaterial::from_pem(KeyAlgorithm::EdDsa, "not a pem", None),
            Err(TokenError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let keys =
            KeyMaterial::from_pem(KeyAlgorithm::EdDsa, PUBLIC_KEY_PEM, Some(PRIVATE_KEY_PEM))
                .unwrap();
        let printed = format!("{keys:?}");
        assert!(printed.contains("can_sign: true"));
        assert!(!printed.contains("PRIVATE"));
    }
}
