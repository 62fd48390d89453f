//! Shared vocabulary types for the Wayfarer backend.
//!
//! Every Wayfarer service speaks in terms of these types: type-safe entity
//! IDs, validated email addresses, and account lifecycle statuses. The crate
//! is deliberately I/O-free so it can be depended on from anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::{AccountStatus, Email, EmailError, GuestId};
pub use types::{AdminUserId, UserId};
