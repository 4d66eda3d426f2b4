//! Configuration for the diet service.

use anyhow::{Context, Result};
use std::env;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            server: ServerSettings::from_env()?,
            auth: AuthSettings::from_env()?,
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
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Same shared secret the gateway stamps identity headers with.
    pub token_secret: String,
}

impl AuthSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            token_secret: env::var("AUTH_TOKEN_SECRET")
                .context("AUTH_TOKEN_SECRET must be set")?,
        })
    }
}
