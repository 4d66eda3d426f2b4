//! Authentication failure taxonomy.
//!
//! Every failure is terminal for its request and binary: either the request
//! is authenticated or it is rejected. The response carries a stable `code`
//! so clients can distinguish "no credential supplied" from "credential not
//! accepted", while the message stays generic to avoid feeding probes.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use token_codec::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,

    #[error("credential is not valid")]
    InvalidCredential,

    #[error("credential has expired")]
    ExpiredToken,

    #[error("credential has been revoked")]
    RevokedCredential,
}

impl AuthError {
    /// Stable machine-readable code surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MissingCredential",
            AuthError::InvalidCredential => "InvalidCredential",
            AuthError::ExpiredToken => "ExpiredToken",
            AuthError::RevokedCredential => "RevokedCredential",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::ExpiredToken => AuthError::ExpiredToken,
            // Signature and parse failures collapse into one code; callers
            // learn nothing about why the credential was never valid.
            TokenError::InvalidSignature
            | TokenError::MalformedToken
            | TokenError::ConfigError => AuthError::InvalidCredential,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthErrorBody {
    pub code: &'static str,
    pub message: &'static str,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(AuthErrorBody {
            code: self.code(),
            message: "authentication failed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_variants_map_to_401() {
        for err in [
            AuthError::MissingCredential,
            AuthError::InvalidCredential,
            AuthError::ExpiredToken,
            AuthError::RevokedCredential,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn expired_token_keeps_its_code() {
        assert_eq!(AuthError::from(TokenError::ExpiredToken), AuthError::ExpiredToken);
    }

    #[test]
    fn signature_and_parse_failures_collapse() {
        assert_eq!(
            AuthError::from(TokenError::InvalidSignature),
            AuthError::InvalidCredential
        );
        assert_eq!(
            AuthError::from(TokenError::MalformedToken),
            AuthError::InvalidCredential
        );
    }
}
