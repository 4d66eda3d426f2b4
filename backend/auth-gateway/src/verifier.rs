//! Credential verification seam.
//!
//! Password storage and user records live in the external identity backend;
//! the gateway only needs a yes/no answer plus the subject and role to put
//! into the issued token. The trait keeps the backend swappable (HTTP call
//! in production, a static stub in tests).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity confirmed by the backend for a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedSubject {
    pub subject: i64,
    pub role: String,
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(None)` means the credentials were understood but wrong; `Err` is
    /// reserved for the backend being unreachable or misbehaving.
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<VerifiedSubject>>;
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Production verifier calling the identity backend over HTTP.
pub struct HttpCredentialVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCredentialVerifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CredentialVerifier for HttpCredentialVerifier {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<VerifiedSubject>> {
        let url = format!("{}/internal/credentials/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&VerifyRequest { username, password })
            .send()
            .await
            .context("credential verification request failed")?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        if !response.status().is_success() {
            anyhow::bail!("identity backend returned {}", response.status());
        }

        let subject = response
            .json::<VerifiedSubject>()
            .await
            .context("failed to parse identity backend response")?;

        Ok(Some(subject))
    }
}
