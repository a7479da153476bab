//! Bearer token issuance.
//!
//! Tokens are HS256 JWTs carrying the verified identity in `username`, valid
//! for a fixed window from the moment they are signed.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

pub trait TokenSigner: Send + Sync {
    /// Sign a bearer token for `subject`.
    ///
    /// # Errors
    /// Returns `SignerError::Sign` if the token cannot be produced.
    fn sign(&self, subject: &str) -> Result<String, SignerError>;

    /// Check a token previously returned by `sign` and return its subject.
    ///
    /// # Errors
    /// Returns `SignerError::Expired` or `SignerError::Invalid`.
    fn verify(&self, token: &str) -> Result<String, SignerError>;
}

pub struct JwtSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl JwtSigner {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds,
        }
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, subject: &str) -> Result<String, SignerError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            username: subject.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(SignerError::Sign)
    }

    fn verify(&self, token: &str) -> Result<String, SignerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.username)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => SignerError::Expired,
                _ => SignerError::Invalid(err),
            })
    }
}

#[cfg(test)]
pub use failing::FailingSigner;
