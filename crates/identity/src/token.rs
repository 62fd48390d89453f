//! Access token issuing and verification.
//!
//! Tokens are signed (HS256), time-limited, and carry an [`IdentityClaim`]
//! plus a `typ: "access"` discriminator. Verification is pure and stateless:
//! signature and expiry only, no store access.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use jsonwebtoken::errors::ErrorKind;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::IdentityClaim;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Discriminator carried by every token this service issues.
pub const TOKEN_TYPE_ACCESS: &str = "access";

/// Errors from token issuing and verification.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's signature is valid but its expiry has passed. A normal
    /// authentication outcome, not a fault.
    #[error("access token expired")]
    Expired,

    /// The token is malformed, signed with the wrong key, or not an access
    /// token. Also a normal authentication outcome.
    #[error("access token invalid")]
    Invalid,

    /// The claim could not be signed.
    #[error("access token could not be signed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Verification failed for a reason that is not a normal auth outcome
    /// (e.g. a key problem). Callers must treat this as fatal.
    #[error("access token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),
}

/// The full signed payload of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The identity this token attests to.
    #[serde(flatten)]
    pub identity: IdentityClaim,
    /// Token type discriminator, always [`TOKEN_TYPE_ACCESS`].
    pub typ: String,
    /// Expiry, in seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues and verifies signed access tokens.
///
/// Cloning is cheap; the service holds only derived keys and the configured
/// lifetime.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service from the shared signing secret.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        // Expiry is exact: short-lived tokens make the default 60s leeway
        // a significant fraction of the lifetime.
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl,
            validation,
        }
    }

    /// Issue a signed access token for `identity`, expiring after the
    /// configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the claim cannot be encoded.
    pub fn issue(&self, identity: &IdentityClaim) -> Result<String, TokenError> {
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = AccessClaims {
            identity: identity.clone(),
            typ: TOKEN_TYPE_ACCESS.to_string(),
            exp: Utc::now().timestamp().saturating_add(ttl_secs),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify a token's signature, expiry, and type.
    ///
    /// # Errors
    ///
    /// - `TokenError::Expired` - signature fine, lifetime over.
    /// - `TokenError::Invalid` - malformed, tampered, or not an access
    ///   token.
    /// - `TokenError::Verification` - unexpected failure; not a normal
    ///   authentication outcome.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(classify_error)?;
        if data.claims.typ != TOKEN_TYPE_ACCESS {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }

    /// Soft verification: `None` on any failure instead of an error.
    ///
    /// For call sites that treat a bad token as "not authenticated" rather
    /// than fatal (e.g. cart attribution, where an expired token must
    /// degrade to guest behavior).
    #[must_use]
    pub fn verify_opt(&self, token: &str) -> Option<AccessClaims> {
        match self.verify(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!(error = %e, "access token rejected, treating as anonymous");
                None
            }
        }
    }
}

fn classify_error(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::ImmatureSignature
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => TokenError::Invalid,
        _ => TokenError::Verification(e),
    }
}
