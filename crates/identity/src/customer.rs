//! Customer identity resolution for cart/order attribution.

use std::ops::RangeInclusive;

use rand::Rng;

use wayfarer_core::GuestId;

use crate::models::{CustomerIds, IdentityClaim};
use crate::session::SessionHandle;
use crate::token::TokenService;

/// Range guest ids are drawn from: far above any real row id in the
/// collaborating CRUD services, capped at the largest JSON-safe integer.
pub const GUEST_ID_RANGE: RangeInclusive<i64> = 1_000_000_000_000..=9_007_199_254_740_991;

/// Derive the `{user_id, guest_id}` pair attributing this session's carts
/// and orders.
///
/// The token, if present, is soft-verified: an expired or invalid token
/// degrades to guest attribution instead of failing the request. The guest
/// id is assigned lazily on first need and is stable for the life of the
/// session - including across login and logout.
///
/// Both ids may be non-null at once; callers must prefer `user_id` when
/// present.
pub async fn get_customer_ids(session: &SessionHandle, tokens: &TokenService) -> CustomerIds {
    let user_id = match session.token().await {
        Some(token) => tokens
            .verify_opt(&token)
            .and_then(|claims| match claims.identity {
                IdentityClaim::User(user) => Some(user.id),
                IdentityClaim::Admin(_) => None,
            }),
        None => None,
    };

    let guest_id = match session.guest_id().await {
        Some(id) => id,
        None => session.set_guest_id(generate_guest_id()).await,
    };

    CustomerIds {
        user_id,
        guest_id: Some(guest_id),
    }
}

fn generate_guest_id() -> GuestId {
    GuestId::new(rand::rng().random_range(GUEST_ID_RANGE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::Session;
    use crate::models::fixtures::{admin_claim, user_claim};
    use crate::session::SessionManager;
    use crate::store::MemoryStore;
    use crate::token::{AccessClaims, TOKEN_TYPE_ACCESS};

    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use secrecy::SecretString;
    use wayfarer_core::UserId;

    const SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6b";

    fn tokens() -> TokenService {
        TokenService::new(&SecretString::from(SECRET), Duration::from_secs(900))
    }

    fn handle(session_id: &str) -> SessionHandle {
        let manager = SessionManager::new(
            Arc::new(MemoryStore::new()),
            "sess",
            Duration::from_secs(1800),
        );
        SessionHandle::new(Session::new(session_id.to_string()), manager)
    }

    #[tokio::test]
    async fn test_anonymous_session_gets_guest_id_only() {
        let session = handle("s-1");
        let ids = get_customer_ids(&session, &tokens()).await;
        assert!(ids.user_id.is_none());
        let guest = ids.guest_id.unwrap();
        assert!(GUEST_ID_RANGE.contains(&guest.as_i64()));
    }

    #[tokio::test]
    async fn test_guest_id_is_idempotent() {
        let session = handle("s-2");
        let tokens = tokens();
        let first = get_customer_ids(&session, &tokens).await;
        let second = get_customer_ids(&session, &tokens).await;
        assert_eq!(first.guest_id, second.guest_id);
    }

    #[tokio::test]
    async fn test_authenticated_session_carries_both_ids() {
        let tokens = tokens();
        let session = handle("s-3");

        // Guest id assigned before login survives it.
        let before = get_customer_ids(&session, &tokens).await;

        let identity = user_claim(21);
        let token = tokens.issue(&identity).unwrap();
        session.set_authenticated(identity, token).await;

        let after = get_customer_ids(&session, &tokens).await;
        assert_eq!(after.user_id, Some(UserId::new(21)));
        assert_eq!(after.guest_id, before.guest_id);
    }

    #[tokio::test]
    async fn test_expired_token_degrades_to_guest() {
        let tokens = tokens();
        let session = handle("s-4");

        let identity = user_claim(21);
        let claims = AccessClaims {
            identity: identity.clone(),
            typ: TOKEN_TYPE_ACCESS.to_string(),
            exp: Utc::now().timestamp() - 10,
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        session.set_authenticated(identity, stale).await;

        // Does not fail, does not clear the session - just no user id.
        let ids = get_customer_ids(&session, &tokens).await;
        assert!(ids.user_id.is_none());
        assert!(ids.guest_id.is_some());
        assert!(session.token().await.is_some());
    }

    #[tokio::test]
    async fn test_admin_token_yields_no_user_id() {
        let tokens = tokens();
        let session = handle("s-5");
        let identity = admin_claim(3);
        let token = tokens.issue(&identity).unwrap();
        session.set_authenticated(identity, token).await;

        let ids = get_customer_ids(&session, &tokens).await;
        assert!(ids.user_id.is_none());
        assert!(ids.guest_id.is_some());
    }
}
