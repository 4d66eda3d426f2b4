//! Redis-backed revocation store.
//!
//! Entries are plain keys written with `SET EX`, TTL sized to the token's
//! remaining validity. `is_revoked` is a single `EXISTS`. Redis evicts the
//! key once the token would have expired anyway.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

use crate::{Result, RevocationStore, StoreError};

const REVOCATION_KEY_PREFIX: &str = "session:revoked:";

pub struct RedisRevocationStore {
    redis: ConnectionManager,
}

impl RedisRevocationStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(token_id: &str) -> String {
        format!("{REVOCATION_KEY_PREFIX}{token_id}")
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token_id: &str, remaining_ttl: Duration) -> Result<()> {
        let ttl_secs = remaining_ttl.as_secs();
        if ttl_secs == 0 {
            // Token already past natural expiry; nothing to record.
            return Ok(());
        }

        let mut conn = self.redis.clone();
        let _: () = conn
            .set_ex(Self::key(token_id), 1u8, ttl_secs)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(token_id = %token_id, ttl_secs, "session token revoked");
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        conn.exists(Self::key(token_id))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
