//! Identity error taxonomy and HTTP mapping.
//!
//! Guard-level rejections (`Unauthorized`, the two `Forbidden` shapes) are
//! expected control-flow outcomes and convert straight to a status code
//! without logging noise. Infrastructure failures are logged and surface as
//! 5xx.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;
use crate::token::TokenError;

/// Errors surfaced by the identity layer to route handlers and middleware.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Missing, expired, or invalid bearer token on a route requiring
    /// authentication.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but the wrong role/status for the route.
    #[error("no permissions")]
    NoPermissions,

    /// Authenticated but the account is flagged blocked. Distinct from the
    /// generic forbidden so clients can show a specific message.
    #[error("account blocked")]
    Blocked,

    /// The session store failed on a read the request cannot proceed
    /// without.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    /// Token verification failed in an unexpected way (not expiry, not
    /// tampering).
    #[error("token verification error: {0}")]
    Token(#[source] TokenError),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized").into_response(),
            Self::NoPermissions => (StatusCode::FORBIDDEN, "no_permissions").into_response(),
            Self::Blocked => (StatusCode::FORBIDDEN, "account_blocked").into_response(),
            Self::Store(e) => {
                tracing::error!(error = %e, "session store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
            Self::Token(e) => {
                tracing::error!(error = %e, "unexpected token verification failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
