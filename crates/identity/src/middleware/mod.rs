//! HTTP middleware for the identity layer.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Session resolver ([`resolve_session`]) - always, before anything that
//!    reads the session
//! 2. Guards - per protected route: [`authenticate`] first, then
//!    [`authorize`] or [`authorize_admin`]
//!
//! Route handlers read the resolved [`SessionHandle`](crate::SessionHandle)
//! and verified claim off the request extensions, either directly or through
//! the [`Authenticated`]/[`RequireAdmin`] extractors.

pub mod guards;
pub mod resolver;

pub use guards::{Authenticated, RequireAdmin, authenticate, authorize, authorize_admin};
pub use resolver::resolve_session;
