//! Session and identity claim models.
//!
//! The [`Session`] record is the unit of per-caller state persisted in the
//! shared store. The [`IdentityClaim`] is the decoded payload of an access
//! token, denormalized onto the session at login time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wayfarer_core::{AccountStatus, AdminUserId, Email, GuestId, UserId};

/// Server-side session record, keyed by the opaque session id.
///
/// Invariants:
/// - `session_id` never changes once assigned.
/// - `token` and `user` are set and cleared together, never one without the
///   other.
/// - `guest_id`, once assigned, is immutable for the life of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier echoed to the client via the identity header.
    pub session_id: String,
    /// Signed access token, present once the caller has authenticated.
    pub token: Option<String>,
    /// Denormalized copy of the verified claim, set at authentication time.
    pub user: Option<IdentityClaim>,
    /// Stable pseudo-identity for anonymous cart/order attribution.
    pub guest_id: Option<GuestId>,
    /// When this record was first materialized.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh, anonymous session.
    #[must_use]
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            token: None,
            user: None,
            guest_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the session currently carries authentication state.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// The identity carried by an access token.
///
/// Exactly one shape is present per session at a time; guards pattern-match
/// on the variant rather than probing for marker fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdentityClaim {
    /// A registered storefront user.
    User(UserClaim),
    /// A back-office administrator.
    Admin(AdminClaim),
}

impl IdentityClaim {
    /// The user claim, if this is a user identity.
    #[must_use]
    pub const fn as_user(&self) -> Option<&UserClaim> {
        match self {
            Self::User(user) => Some(user),
            Self::Admin(_) => None,
        }
    }

    /// The admin claim, if this is an admin identity.
    #[must_use]
    pub const fn as_admin(&self) -> Option<&AdminClaim> {
        match self {
            Self::Admin(admin) => Some(admin),
            Self::User(_) => None,
        }
    }
}

/// Claim shape for a registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClaim {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub status: AccountStatus,
    pub is_blocked: bool,
}

/// Claim shape for a back-office administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminClaim {
    pub id: AdminUserId,
    pub name: String,
    pub email: Email,
}

/// Derived cart/order attribution for a session.
///
/// Both ids may be non-null at once: a logged-in user still carries the
/// guest id assigned before login. Callers choosing ownership must prefer
/// `user_id` when present; that precedence is a contract on the caller, not
/// something this type enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIds {
    pub user_id: Option<UserId>,
    pub guest_id: Option<GuestId>,
}
