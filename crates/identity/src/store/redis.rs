//! Redis-backed session store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use secrecy::{ExposeSecret, SecretString};

use super::{SessionStore, StoreError};

/// Session store backed by Redis (or a Redis-compatible database such as
/// Valkey).
///
/// Holds a [`ConnectionManager`], which multiplexes commands over a single
/// reconnecting connection; cloning is cheap.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("conn", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Connect to the store at `url`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the URL is invalid or the initial
    /// connection cannot be established.
    pub async fn connect(url: &SecretString) -> Result<Self, StoreError> {
        let client = redis::Client::open(url.expose_secret())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub const fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}
