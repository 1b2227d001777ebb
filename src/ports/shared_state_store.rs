//! Shared State Store Port - key-value storage visible to every process.
//!
//! Backs cross-process circuit breaker state. Writes are full overwrites
//! (last writer wins) and every entry carries a time-to-live.

use async_trait::async_trait;
use std::time::Duration;

/// Errors from the shared state store.
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Port for TTL-bounded shared key-value state.
#[async_trait]
pub trait SharedStateStore: Send + Sync {
    /// Returns the stored bytes, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StateStoreError>;

    /// Overwrites `key` with `value`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StateStoreError>;

    /// Removes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StateStoreError>;

    /// Lists live keys starting with `prefix`.
    async fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StateStoreError>;
}
