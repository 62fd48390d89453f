//! Session persistence and the mutation-tracking handle.
//!
//! [`SessionManager`] owns the store key layout and the write path:
//! `{prefix}_{session_id}` holds the serialized record, and whenever the
//! record carries a user claim, a secondary `{user_id} -> session_id` index
//! is written alongside it so an out-of-band actor (an admin blocking the
//! user) can find the session without knowing its id. Both keys get the
//! sliding TTL on every write.
//!
//! [`SessionHandle`] replaces the per-field interception a dynamic object
//! model would use with an explicit mutator API: each mutator applies the
//! field change in memory and then persists the whole record. The persist is
//! best-effort: a mutation must never fail the request it runs
//! in; the in-memory value stays updated so request-local logic sees it, and
//! the degradation (a future request reading stale state) is logged.
//!
//! Ordering is last-write-wins at the store. Two racing requests for the
//! same session each persist their own full record and whichever write
//! lands last sticks; there is no read-modify-write atomicity across
//! requests. Sessions are a per-caller convenience cache, not a system of
//! record - callers must not use session mutation as a substitute for a
//! transactional resource.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use wayfarer_core::{GuestId, UserId};

use crate::models::{IdentityClaim, Session};
use crate::store::{SessionStore, StoreError};

/// Store-facing session persistence: key layout, sliding TTL, secondary
/// index, forced invalidation.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    prefix: String,
    ttl: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager over `store` with the given key prefix and sliding
    /// TTL.
    pub fn new(store: Arc<dyn SessionStore>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl,
        }
    }

    fn record_key(&self, session_id: &str) -> String {
        format!("{}_{}", self.prefix, session_id)
    }

    fn index_key(user_id: UserId) -> String {
        user_id.to_string()
    }

    /// Load the session record for `session_id`.
    ///
    /// A missing record and an undeserializable record both come back as
    /// `None`: the resolver transparently starts a fresh session in either
    /// case. Store failures propagate.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store read fails.
    pub async fn load(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let Some(raw) = self.store.get(&self.record_key(session_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(
                    session_id,
                    error = %e,
                    "discarding undeserializable session record"
                );
                Ok(None)
            }
        }
    }

    /// Persist the whole record, refreshing the sliding TTL, and write the
    /// `user_id -> session_id` index when a user claim is present.
    ///
    /// The two writes are separate SETs; the index is eventually consistent
    /// with the record and readers of it must tolerate a stale or missing
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if serialization or either store write fails.
    pub async fn persist(&self, session: &Session) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(session)?;
        self.store
            .set(&self.record_key(&session.session_id), &raw, Some(self.ttl))
            .await?;

        if let Some(IdentityClaim::User(user)) = &session.user {
            self.store
                .set(
                    &Self::index_key(user.id),
                    session.session_id.as_bytes(),
                    Some(self.ttl),
                )
                .await?;
        }
        Ok(())
    }

    /// [`persist`](Self::persist), but failures are logged and swallowed.
    ///
    /// This is the write path of every [`SessionHandle`] mutator: a store
    /// outage degrades to stale session state on a future request instead of
    /// failing the current one.
    pub async fn persist_best_effort(&self, session: &Session) {
        if let Err(e) = self.persist(session).await {
            tracing::warn!(
                session_id = %session.session_id,
                error = %e,
                "session persist failed; in-memory state retained for this request"
            );
        }
    }

    /// Forcibly clear the authentication state of the session belonging to
    /// `user_id`, found via the secondary index.
    ///
    /// Returns `true` if a session was found and cleared. A missing index
    /// entry or missing session is not an error: the index is best-effort
    /// and the session may simply have expired.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a store read fails or the cleared record
    /// cannot be written back.
    pub async fn invalidate_user(&self, user_id: UserId) -> Result<bool, StoreError> {
        let index_key = Self::index_key(user_id);
        let Some(raw) = self.store.get(&index_key).await? else {
            return Ok(false);
        };
        let session_id = String::from_utf8_lossy(&raw).into_owned();

        let invalidated = match self.load(&session_id).await? {
            Some(mut session) => {
                session.token = None;
                session.user = None;
                self.persist(&session).await?;
                true
            }
            None => false,
        };

        // The index entry has served its purpose either way.
        if let Err(e) = self.store.delete(&index_key).await {
            tracing::warn!(%user_id, error = %e, "failed to remove session index entry");
        }
        Ok(invalidated)
    }

    /// The configured sliding TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Request-scoped handle to a session.
///
/// Cheaply cloneable; lives in the request extensions. Every mutator makes
/// the change immediately durable (best-effort) with the TTL refreshed.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Arc<str>,
    inner: Arc<Mutex<Session>>,
    manager: SessionManager,
}

impl SessionHandle {
    /// Wrap a resolved session.
    #[must_use]
    pub fn new(session: Session, manager: SessionManager) -> Self {
        Self {
            session_id: Arc::from(session.session_id.as_str()),
            inner: Arc::new(Mutex::new(session)),
            manager,
        }
    }

    /// The opaque session id. Stable for the life of the session.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// A point-in-time copy of the record.
    pub async fn snapshot(&self) -> Session {
        self.inner.lock().await.clone()
    }

    /// The session's access token, if authenticated.
    pub async fn token(&self) -> Option<String> {
        self.inner.lock().await.token.clone()
    }

    /// The denormalized identity claim, if authenticated.
    pub async fn user(&self) -> Option<IdentityClaim> {
        self.inner.lock().await.user.clone()
    }

    /// The stable guest id, if one has been assigned.
    pub async fn guest_id(&self) -> Option<GuestId> {
        self.inner.lock().await.guest_id
    }

    /// Install authentication state: the verified claim and its token are
    /// set together, never one without the other.
    pub async fn set_authenticated(&self, claim: IdentityClaim, token: String) {
        self.mutate(|session| {
            session.token = Some(token);
            session.user = Some(claim);
        })
        .await;
    }

    /// Clear authentication state: logout, detected token expiry, and
    /// forced invalidation all take this path. `session_id` and `guest_id`
    /// survive.
    pub async fn logout(&self) {
        self.mutate(|session| {
            session.token = None;
            session.user = None;
        })
        .await;
    }

    /// Assign the guest id if the session does not already have one.
    ///
    /// A guest id is immutable once assigned; the effective id is returned
    /// either way.
    pub async fn set_guest_id(&self, candidate: GuestId) -> GuestId {
        let session = self
            .mutate(|session| {
                session.guest_id.get_or_insert(candidate);
            })
            .await;
        session.guest_id.unwrap_or(candidate)
    }

    /// Apply `f` under the lock, then persist the mutated record
    /// best-effort. Returns the post-mutation snapshot.
    async fn mutate(&self, f: impl FnOnce(&mut Session)) -> Session {
        let snapshot = {
            let mut session = self.inner.lock().await;
            f(&mut session);
            session.clone()
        };
        self.manager.persist_best_effort(&snapshot).await;
        snapshot
    }
}
