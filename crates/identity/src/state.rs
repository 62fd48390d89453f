//! Shared identity state threaded through the middleware and guards.

use std::sync::Arc;

use crate::config::IdentityConfig;
use crate::session::SessionManager;
use crate::store::{MemoryStore, RedisStore, SessionStore, StoreError};
use crate::token::TokenService;

/// Identity layer state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; constructed once at startup from a validated
/// [`IdentityConfig`] and handed to the session resolver as axum state.
#[derive(Clone)]
pub struct IdentityState {
    inner: Arc<IdentityStateInner>,
}

struct IdentityStateInner {
    config: IdentityConfig,
    tokens: TokenService,
    sessions: SessionManager,
}

impl IdentityState {
    /// Assemble state from a config and an already-constructed store.
    #[must_use]
    pub fn new(config: IdentityConfig, store: Arc<dyn SessionStore>) -> Self {
        let tokens = TokenService::new(&config.token_secret, config.token_ttl);
        let sessions =
            SessionManager::new(store, config.session_prefix.clone(), config.session_ttl);

        Self {
            inner: Arc::new(IdentityStateInner {
                config,
                tokens,
                sessions,
            }),
        }
    }

    /// Connect to the configured store and assemble state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store connection cannot be established.
    pub async fn connect(config: IdentityConfig) -> Result<Self, StoreError> {
        let store = RedisStore::connect(&config.store_url).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Assemble state over an in-memory store (tests, local development).
    #[must_use]
    pub fn with_memory_store(config: IdentityConfig) -> (Self, MemoryStore) {
        let store = MemoryStore::new();
        let state = Self::new(config, Arc::new(store.clone()));
        (state, store)
    }

    /// Get a reference to the identity configuration.
    #[must_use]
    pub fn config(&self) -> &IdentityConfig {
        &self.inner.config
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the session manager.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }
}
