//! Shared gateway state, built once in `main` and handed to actix workers.

use actix_auth::AuthState;
use std::sync::Arc;
use std::time::Duration;

use crate::verifier::CredentialVerifier;

pub struct GatewayState {
    /// Codec, policy, store and stamper shared with the filter chain.
    pub auth: Arc<AuthState>,
    /// Seam to the identity backend for login credential checks.
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Client used to forward authenticated traffic upstream.
    pub http: reqwest::Client,
    /// Lifetime of newly issued session tokens.
    pub session_ttl: Duration,
    /// Base URL authenticated `/api` traffic is proxied to.
    pub upstream_service_url: String,
}
