//! Authorization guards.
//!
//! Guards assume the session resolver has already run. [`authenticate`]
//! verifies the session's bearer token and yields the claim; [`authorize`]
//! and [`authorize_admin`] check the claim against a route's requirements.
//! The [`Authenticated`] and [`RequireAdmin`] extractors wrap the same
//! logic for handlers that prefer declaring requirements in their
//! signatures.

use std::collections::HashSet;

use axum::{extract::FromRequestParts, http::request::Parts};

use wayfarer_core::AccountStatus;

use crate::error::IdentityError;
use crate::models::{AdminClaim, IdentityClaim};
use crate::session::SessionHandle;
use crate::token::{TokenError, TokenService};

/// Verify the session's bearer token and return the identity it attests to.
///
/// An expired or invalid token clears the session's auth state (token and
/// claim together, persisted) before rejecting - the next request starts
/// cleanly anonymous instead of retrying a dead token.
///
/// # Errors
///
/// - `IdentityError::Unauthorized` - no token, expired token, or invalid
///   token. Never anything else for these cases.
/// - `IdentityError::Token` - verification failed in an unexpected way;
///   treated as fatal, the session is left untouched.
pub async fn authenticate(
    session: &SessionHandle,
    tokens: &TokenService,
) -> Result<IdentityClaim, IdentityError> {
    let Some(token) = session.token().await else {
        return Err(IdentityError::Unauthorized);
    };

    match tokens.verify(&token) {
        Ok(claims) => Ok(claims.identity),
        Err(e @ (TokenError::Expired | TokenError::Invalid)) => {
            tracing::debug!(
                session_id = session.id(),
                error = %e,
                "clearing session auth state"
            );
            session.logout().await;
            Err(IdentityError::Unauthorized)
        }
        Err(e) => Err(IdentityError::Token(e)),
    }
}

/// Check a verified claim against a route's allowed account statuses.
///
/// `allowed = None` skips the status check (any authenticated caller). The
/// blocked-account check always runs for user claims and yields a forbidden
/// code distinct from the generic one. Admin claims carry no status and are
/// not members of any user status set.
///
/// # Errors
///
/// - `IdentityError::NoPermissions` - status not in the allowed set, or an
///   admin claim presented to a status-gated route.
/// - `IdentityError::Blocked` - the account is flagged blocked, even if its
///   status is allowed.
pub fn authorize(
    claim: &IdentityClaim,
    allowed: Option<&HashSet<AccountStatus>>,
) -> Result<(), IdentityError> {
    match claim {
        IdentityClaim::User(user) => {
            if let Some(allowed) = allowed {
                if !allowed.contains(&user.status) {
                    return Err(IdentityError::NoPermissions);
                }
            }
            if user.is_blocked {
                return Err(IdentityError::Blocked);
            }
            Ok(())
        }
        IdentityClaim::Admin(_) => {
            if allowed.is_some() {
                Err(IdentityError::NoPermissions)
            } else {
                Ok(())
            }
        }
    }
}

/// Require an admin-shaped claim.
///
/// # Errors
///
/// Returns `IdentityError::NoPermissions` for any non-admin claim, however
/// well-formed.
pub fn authorize_admin(claim: &IdentityClaim) -> Result<&AdminClaim, IdentityError> {
    claim.as_admin().ok_or(IdentityError::NoPermissions)
}

/// Extractor that requires an authenticated caller.
///
/// Runs [`authenticate`] against the resolved session and caches the
/// verified claim in the request extensions, so downstream guards and
/// handlers see the same claim without re-verifying.
///
/// # Example
///
/// ```rust,ignore
/// async fn account_handler(
///     Authenticated(claim): Authenticated,
/// ) -> impl IntoResponse {
///     format!("hello, {claim:?}")
/// }
/// ```
pub struct Authenticated(pub IdentityClaim);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A guard earlier in the chain may already have attached the claim.
        if let Some(claim) = parts.extensions.get::<IdentityClaim>() {
            return Ok(Self(claim.clone()));
        }

        // Both are installed by the session resolver; their absence means
        // the resolver never ran, which reads as unauthenticated.
        let session = parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or(IdentityError::Unauthorized)?;
        let tokens = parts
            .extensions
            .get::<TokenService>()
            .cloned()
            .ok_or(IdentityError::Unauthorized)?;

        let claim = authenticate(&session, &tokens).await?;
        parts.extensions.insert(claim.clone());
        Ok(Self(claim))
    }
}

/// Extractor that requires an authenticated admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn admin_handler(
///     RequireAdmin(admin): RequireAdmin,
/// ) -> impl IntoResponse {
///     format!("hello, {}", admin.name)
/// }
/// ```
pub struct RequireAdmin(pub AdminClaim);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(claim) = Authenticated::from_request_parts(parts, state).await?;
        let admin = authorize_admin(&claim)?;
        Ok(Self(admin.clone()))
    }
}
