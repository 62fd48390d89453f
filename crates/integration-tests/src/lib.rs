//! Integration test harness for the Wayfarer identity layer.
//!
//! Builds a small in-process axum application - the shape a consuming
//! service would have - wired with the in-memory store, so the end-to-end
//! scenarios run hermetically: no Redis, no listening socket, requests
//! driven through `tower::ServiceExt::oneshot`.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Test-support crate: handlers fabricate fixtures and may unwrap.
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

use std::collections::HashSet;
use std::time::Duration;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::HeaderName,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use wayfarer_core::{AccountStatus, AdminUserId, Email, UserId};
use wayfarer_identity::{
    AdminClaim, Authenticated, CustomerIds, IdentityClaim, IdentityConfig, IdentityError,
    IdentityState, MemoryStore, RequireAdmin, SessionHandle, UserClaim, authorize,
    get_customer_ids, middleware::resolve_session,
};

/// The identity header the test application is configured with.
pub const IDENTITY_HEADER: &str = "identity";

/// A validated config pointing at nothing external.
#[must_use]
pub fn test_config() -> IdentityConfig {
    IdentityConfig {
        identity_header: HeaderName::from_static(IDENTITY_HEADER),
        internal_header: HeaderName::from_static("x-wayfarer-caller"),
        token_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6b"),
        store_url: SecretString::from("redis://127.0.0.1:6379"),
        session_ttl: Duration::from_secs(1800),
        token_ttl: Duration::from_secs(900),
        session_prefix: "sess".to_string(),
        open_paths: vec!["/health".to_string()],
    }
}

/// Identity state over a fresh in-memory store. The store handle is
/// returned so tests can inspect or corrupt what the layer persists.
#[must_use]
pub fn test_state() -> (IdentityState, MemoryStore) {
    init_tracing();
    IdentityState::with_memory_store(test_config())
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Run with `RUST_LOG=wayfarer_identity=debug` to watch the layer's
/// persist/verify decisions while a test runs.
pub fn init_tracing() {
    use std::sync::Once;

    static TRACING: Once = Once::new();
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "wayfarer_identity=info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Login parameters for the fixture login route.
#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub status: Option<String>,
    pub blocked: Option<bool>,
}

/// Build the demo application: a stand-in for a consuming CRUD service,
/// with the session resolver in front of every route and guard-protected
/// routes behind it.
#[must_use]
pub fn demo_app(state: IdentityState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/whoami", get(whoami))
        .route("/login/{id}", post(login))
        .route("/login-admin/{id}", post(login_admin))
        .route("/logout", post(logout))
        .route("/account", get(account))
        .route("/onboarding", get(onboarding))
        .route("/admin/reports", get(admin_reports))
        .layer(from_fn_with_state(state.clone(), resolve_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn whoami(
    State(state): State<IdentityState>,
    Extension(session): Extension<SessionHandle>,
) -> Json<CustomerIds> {
    Json(get_customer_ids(&session, state.tokens()).await)
}

async fn login(
    State(state): State<IdentityState>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<i32>,
    Query(params): Query<LoginParams>,
) -> Result<&'static str, IdentityError> {
    let status = params
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(AccountStatus::Active);

    let claim = IdentityClaim::User(UserClaim {
        id: UserId::new(id),
        first_name: "Test".to_string(),
        last_name: "Traveler".to_string(),
        email: Email::parse("traveler@example.com").unwrap(),
        status,
        is_blocked: params.blocked.unwrap_or(false),
    });
    let token = state.tokens().issue(&claim).map_err(IdentityError::Token)?;
    session.set_authenticated(claim, token).await;
    Ok("logged in")
}

async fn login_admin(
    State(state): State<IdentityState>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<i32>,
) -> Result<&'static str, IdentityError> {
    let claim = IdentityClaim::Admin(AdminClaim {
        id: AdminUserId::new(id),
        name: "Ops".to_string(),
        email: Email::parse("ops@example.com").unwrap(),
    });
    let token = state.tokens().issue(&claim).map_err(IdentityError::Token)?;
    session.set_authenticated(claim, token).await;
    Ok("logged in")
}

async fn logout(Extension(session): Extension<SessionHandle>) -> &'static str {
    session.logout().await;
    "logged out"
}

/// Requires a fully active account.
async fn account(Authenticated(claim): Authenticated) -> Result<&'static str, IdentityError> {
    let allowed: HashSet<AccountStatus> = [AccountStatus::Active].into();
    authorize(&claim, Some(&allowed))?;
    Ok("account")
}

/// Reachable by accounts that have not verified their email yet.
async fn onboarding(Authenticated(claim): Authenticated) -> Result<&'static str, IdentityError> {
    let allowed: HashSet<AccountStatus> = [AccountStatus::Pending, AccountStatus::Active].into();
    authorize(&claim, Some(&allowed))?;
    Ok("onboarding")
}

async fn admin_reports(RequireAdmin(admin): RequireAdmin) -> String {
    format!("reports for {}", admin.name)
}
