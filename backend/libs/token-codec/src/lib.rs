//! Signed session token issuance and verification.
//!
//! Session tokens are HS256 JWTs carrying the subject identity, role and a
//! unique token id (`jti`) used as the revocation key. Every verifying party
//! shares the same symmetric secret, so verification is local to each service
//! and never requires a network round trip. Revocation is handled separately
//! by the revocation store.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use token_codec::SessionTokenCodec;
//!
//! let codec = SessionTokenCodec::new("an-adequately-long-signing-secret!!").unwrap();
//! let token = codec.issue(42, "user", Duration::from_secs(3600)).unwrap();
//! let claims = codec.verify(&token).unwrap();
//! assert_eq!(claims.subject().unwrap(), 42);
//! ```

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Signing algorithm shared by all services. Symmetric, so issuance and
/// verification use the same configured secret.
const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Secrets shorter than this are rejected at startup.
const MIN_SECRET_BYTES: usize = 32;

pub type Result<T> = std::result::Result<T, TokenError>;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret is missing or too weak")]
    ConfigError,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed")]
    MalformedToken,
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject id, stringified per JWT convention.
    pub sub: String,
    /// Role granted at issuance.
    pub role: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Unique token identifier, the key under which revocations are recorded.
    pub jti: String,
}

impl SessionClaims {
    /// Parse the subject id out of the `sub` claim.
    pub fn subject(&self) -> Result<i64> {
        self.sub.parse().map_err(|_| TokenError::MalformedToken)
    }

    /// Seconds of validity left at `now`; zero once the token has expired.
    ///
    /// Used to size revocation entries so the store never outlives the token.
    pub fn remaining_ttl(&self, now: i64) -> Duration {
        Duration::from_secs(self.exp.saturating_sub(now).max(0) as u64)
    }
}

/// Issues and verifies signed session tokens.
///
/// Constructed once at startup from the shared secret and passed explicitly
/// to every component that needs it. Verification is a pure function of the
/// token and the secret; it performs no I/O.
#[derive(Clone)]
pub struct SessionTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionTokenCodec {
    /// Build a codec from the shared signing secret.
    ///
    /// Fails with `ConfigError` if the secret is absent or shorter than 32
    /// bytes, which aborts startup rather than issuing weakly signed tokens.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::ConfigError);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Issue a signed token for `subject` with the given role and lifetime.
    pub fn issue(&self, subject: i64, role: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(ttl).map_err(|_| TokenError::ConfigError)?;

        let claims = SessionClaims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|_| TokenError::ConfigError)
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Zero leeway: a token is rejected from the instant `exp` is reached.
    /// Does not consult the revocation store; callers layer that on top.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        self.decode_with(token, &validation)
    }

    /// Verify the signature but accept an expired token.
    ///
    /// Logout uses this so revoking an already-expired token stays an
    /// idempotent no-op success instead of a rejection.
    pub fn verify_allow_expired(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        self.decode_with(token, &validation)
    }

    fn decode_with(&self, token: &str, validation: &Validation) -> Result<SessionClaims> {
        match decode::<SessionClaims>(token, &self.decoding_key, validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => Err(match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::MalformedToken,
            }),
        }
    }
}
