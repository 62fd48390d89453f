//! Key-value session store.
//!
//! A thin, typed wrapper over the shared external cache. Values are opaque
//! byte payloads; serialization is the caller's job. Absence is a normal,
//! non-error outcome (the new-session case). Store failures surface as
//! [`StoreError`] rather than being silently swallowed; the layers above
//! decide where best-effort semantics apply.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the key-value store or the (de)serialization of records
/// stored in it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    /// A stored payload could not be serialized or deserialized.
    #[error("store payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Shared key-value store with per-key expiration.
///
/// All operations are safe to retry. A `get` miss is `Ok(None)`, never an
/// error.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Write `value` under `key`, replacing any existing value. When `ttl`
    /// is given the key expires after that duration.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Read the value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
