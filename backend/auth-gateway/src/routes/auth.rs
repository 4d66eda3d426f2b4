//! Session endpoints.
//!
//! POST /api/auth/login  - verify credentials, issue a session token
//! POST /api/auth/logout - revoke the presented session token
//!
//! Both paths are allow-anonymous in the policy: login has no identity yet
//! and logout must accept expired tokens (revoking one is a no-op success),
//! so it validates the token itself instead of relying on the filter.

use actix_web::http::header;
use actix_web::{error, web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{error as log_error, info, warn};
use validator::Validate;

use actix_auth::error::{AuthError, AuthErrorBody};

use crate::state::GatewayState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub subject: i64,
}

/// POST /api/auth/login
pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<GatewayState>,
) -> Result<HttpResponse> {
    req.validate().map_err(error::ErrorBadRequest)?;
    info!(username = %req.username, "POST /api/auth/login");

    match state
        .verifier
        .verify_credentials(&req.username, &req.password)
        .await
    {
        Ok(Some(verified)) => {
            let token = state
                .auth
                .codec
                .issue(verified.subject, &verified.role, state.session_ttl)
                .map_err(error::ErrorInternalServerError)?;

            info!(subject = verified.subject, "session issued");

            Ok(HttpResponse::Ok().json(LoginResponse {
                token,
                token_type: "Bearer",
                expires_in: state.session_ttl.as_secs(),
                subject: verified.subject,
            }))
        }
        Ok(None) => {
            warn!(username = %req.username, "login rejected");
            Ok(HttpResponse::Unauthorized().json(AuthErrorBody {
                code: "InvalidCredential",
                message: "invalid username or password",
            }))
        }
        Err(err) => {
            log_error!(error = %err, "credential verification failed");
            Ok(HttpResponse::BadGateway().json(AuthErrorBody {
                code: "UpstreamUnavailable",
                message: "identity backend unavailable",
            }))
        }
    }
}

/// POST /api/auth/logout
///
/// Idempotent: revoking an already-revoked token overwrites its entry, and
/// an already-expired token has zero remaining validity so nothing is
/// recorded. Either way the caller gets 204. The revocation write completes
/// before the response is sent, so the very next request with this token
/// observes it.
pub async fn logout(req: HttpRequest, state: web::Data<GatewayState>) -> Result<HttpResponse> {
    let Some(token) = bearer_token(&req) else {
        return Err(AuthError::MissingCredential.into());
    };

    let claims = match state.auth.codec.verify_allow_expired(token) {
        Ok(claims) => claims,
        Err(err) => {
            warn!(error = %err, "logout with unverifiable token");
            return Err(AuthError::from(err).into());
        }
    };

    let remaining = claims.remaining_ttl(Utc::now().timestamp());
    let revoked = timeout(
        state.auth.store_timeout,
        state.auth.store.revoke(&claims.jti, remaining),
    )
    .await;

    match revoked {
        Ok(Ok(())) => {
            info!(subject = %claims.sub, "session revoked");
            Ok(HttpResponse::NoContent().finish())
        }
        Ok(Err(err)) => {
            log_error!(error = %err, "revocation write failed");
            Ok(store_unavailable())
        }
        Err(_) => {
            log_error!("revocation write timed out");
            Ok(store_unavailable())
        }
    }
}

fn store_unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(AuthErrorBody {
        code: "StoreUnavailable",
        message: "revocation store unavailable",
    })
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
