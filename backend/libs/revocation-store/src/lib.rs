//! Shared revocation ledger for session tokens.
//!
//! Records token ids that must be rejected before their natural expiry.
//! Entries carry a time-to-live equal to the token's remaining validity, so
//! the store holds at most the set of not-yet-expired revoked tokens and
//! needs no explicit cleanup.
//!
//! The store is abstracted behind [`RevocationStore`] so the gateway's
//! fail-open/fail-closed policy and the backing implementation (Redis in
//! production, in-memory in tests and single-process deployments) vary
//! independently.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod memory;
mod redis_store;

pub use memory::InMemoryRevocationStore;
pub use redis_store::RedisRevocationStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
}

/// What the authentication filter does when the store cannot answer.
///
/// Fail-closed treats an unreachable store as "revoked" and rejects the
/// request; it is the default and the recommended posture for a system whose
/// primary asset is user data. Fail-open is an explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    FailClosed,
    FailOpen,
}

/// Point operations over the revocation ledger.
///
/// Both operations are independent and read-committed: once `revoke`
/// returns, every subsequent `is_revoked` for the same token id observes the
/// entry. No cross-token ordering is promised or needed.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token_id` as revoked for `remaining_ttl`.
    ///
    /// A zero `remaining_ttl` means the token has already expired naturally
    /// and the call is a no-op success. Re-revoking an already-revoked token
    /// overwrites the entry; the operation is idempotent.
    async fn revoke(&self, token_id: &str, remaining_ttl: Duration) -> Result<()>;

    /// Whether `token_id` currently has a live revocation entry.
    async fn is_revoked(&self, token_id: &str) -> Result<bool>;
}
