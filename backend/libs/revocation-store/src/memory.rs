//! In-memory revocation store for tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::{Result, RevocationStore};

/// Process-local revocation ledger.
///
/// Entries map a token id to the instant its revocation stops mattering
/// (the token's natural expiry). Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token_id: &str, remaining_ttl: Duration) -> Result<()> {
        if remaining_ttl.is_zero() {
            return Ok(());
        }

        let deadline = Instant::now() + remaining_ttl;
        self.lock().insert(token_id.to_string(), deadline);
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool> {
        let mut entries = self.lock();
        match entries.get(token_id) {
            Some(deadline) if *deadline > Instant::now() => Ok(true),
            Some(_) => {
                entries.remove(token_id);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
