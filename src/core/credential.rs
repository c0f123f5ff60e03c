//! Bearer credential decoding
//!
//! The engine only needs one thing from a credential: the subject identity.
//! Decoding never fails loudly. A token that is missing, expired, badly
//! signed or lacks a `sub` claim produces no identity.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

/// Extracts a subject identity string from a bearer token
pub trait CredentialDecoder: Send + Sync {
    /// Subject claim of `token`, or `None` when the token cannot be trusted
    fn subject(&self, token: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct SubjectClaims {
    sub: Option<String>,
}

/// JWT decoder backed by `jsonwebtoken`
pub struct JwtDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl JwtDecoder {
    /// HMAC-SHA256 shared secret
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    /// RS256 public key in PEM form
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self::new(DecodingKey::from_rsa_pem(pem)?, Algorithm::RS256))
    }

    pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        // `sub` is checked by hand so a missing claim maps to no identity.
        // `exp` stays required, otherwise a token without it never expires.
        validation.set_required_spec_claims(&["exp"]);
        JwtDecoder { key, validation }
    }

    /// Only accept tokens from this issuer
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Toggle `exp` validation (on by default)
    ///
    /// While enabled, a token without an `exp` claim is rejected.
    pub fn validate_expiry(mut self, enabled: bool) -> Self {
        self.validation.validate_exp = enabled;
        if enabled {
            self.validation.required_spec_claims.insert("exp".to_string());
        } else {
            self.validation.required_spec_claims.remove("exp");
        }
        self
    }
}

impl CredentialDecoder for JwtDecoder {
    fn subject(&self, token: &str) -> Option<String> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        match decode::<SubjectClaims>(token, &self.key, &self.validation) {
            Ok(data) => data.claims.sub.filter(|s| !s.is_empty()),
            Err(e) => {
                debug!("Discarding undecodable credential: {}", e);
                None
            }
        }
    }
}
