//! Configuration for the authentication gateway.
//!
//! Everything comes from environment variables (with a `.env` file loaded in
//! development builds), is validated once at startup, and is passed
//! explicitly to the components that need it. There is no ambient mutable
//! configuration.

use anyhow::{Context, Result};
use revocation_store::FailurePolicy;
use std::env;
use tracing::info;

/// Policy applied when `AUTH_POLICY_RULES` is not set: the auth endpoints
/// and the liveness probe are open, everything else under `/api` needs a
/// verified identity. Unmatched paths fall back to require-identity anyway.
pub const DEFAULT_POLICY_RULES: &str =
    "allow * /api/auth/**, allow GET /health, require * /api/**";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub redis: RedisSettings,
    pub auth: AuthSettings,
    pub upstream: UpstreamSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            server: ServerSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            auth: AuthSettings::from_env()?,
            upstream: UpstreamSettings::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
}

impl RedisSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("REDIS_URL").context("REDIS_URL must be set")?,
        })
    }
}

/// Token, policy and revocation settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Symmetric signing secret shared by every verifying party.
    pub token_secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_seconds: u64,
    /// Explicit override only; the default is fail-closed.
    pub fail_open: bool,
    /// Ordered policy rule list, see [`auth_policy::PolicyMatcher::parse`].
    pub policy_rules: String,
    /// Budget for a single revocation store call.
    pub store_timeout_ms: u64,
}

impl AuthSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            token_secret: env::var("AUTH_TOKEN_SECRET")
                .context("AUTH_TOKEN_SECRET must be set")?,
            session_ttl_seconds: env::var("AUTH_SESSION_TTL_SECONDS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .context("Invalid AUTH_SESSION_TTL_SECONDS")?,
            fail_open: env::var("AUTH_REVOCATION_FAIL_OPEN")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid AUTH_REVOCATION_FAIL_OPEN")?,
            policy_rules: env::var("AUTH_POLICY_RULES")
                .unwrap_or_else(|_| DEFAULT_POLICY_RULES.to_string()),
            store_timeout_ms: env::var("AUTH_STORE_TIMEOUT_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .context("Invalid AUTH_STORE_TIMEOUT_MS")?,
        })
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.fail_open {
            FailurePolicy::FailOpen
        } else {
            FailurePolicy::FailClosed
        }
    }
}

/// Base URLs of the services the gateway talks to.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Identity backend used for credential verification at login.
    pub identity_url: String,
    /// Where authenticated `/api` traffic is forwarded.
    pub service_url: String,
}

impl UpstreamSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            identity_url: env::var("UPSTREAM_IDENTITY_URL")
                .context("UPSTREAM_IDENTITY_URL must be set")?,
            service_url: env::var("UPSTREAM_SERVICE_URL")
                .context("UPSTREAM_SERVICE_URL must be set")?,
        })
    }
}
