//! Wayfarer distributed identity & session layer.
//!
//! A horizontally-scaled, stateless REST tier recognizes the same caller
//! (anonymous guest or authenticated user/admin) across independent requests
//! and replicas using only two things: an opaque identity header echoed by
//! the client, and a shared key-value store. No cookies, no sticky state.
//!
//! # Architecture
//!
//! - [`store`] - typed wrapper over the shared key-value store (Redis in
//!   production, in-memory for tests)
//! - [`token`] - signed, time-limited access tokens carrying an identity
//!   claim
//! - [`session`] - the per-caller session record, its manager, and the
//!   mutator handle that makes every mutation immediately durable
//! - [`middleware`] - the axum session resolver and the authorization guards
//! - [`customer`] - stable `{user_id, guest_id}` attribution for carts and
//!   orders
//! - [`propagation`] - caller identity forwarding to sibling services
//!
//! Consuming services layer [`middleware::resolve_session`] in front of
//! every route, then gate protected routes with the guards. Handlers read
//! the resolved identity off the request extensions; they never touch the
//! store directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod customer;
pub mod error;
pub mod middleware;
pub mod models;
pub mod propagation;
pub mod session;
pub mod state;
pub mod store;
pub mod token;

pub use config::{ConfigError, IdentityConfig};
pub use customer::get_customer_ids;
pub use error::IdentityError;
pub use middleware::{Authenticated, RequireAdmin, authenticate, authorize, authorize_admin};
pub use middleware::resolve_session;
pub use models::{AdminClaim, CustomerIds, IdentityClaim, Session, UserClaim};
pub use session::{SessionHandle, SessionManager};
pub use state::IdentityState;
pub use store::{MemoryStore, RedisStore, SessionStore, StoreError};
pub use token::{AccessClaims, TokenError, TokenService};
