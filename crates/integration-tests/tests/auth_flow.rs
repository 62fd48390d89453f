//! Authentication and authorization flows end to end.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use wayfarer_core::UserId;
use wayfarer_integration_tests::{IDENTITY_HEADER, demo_app, test_state};

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start a session and return its id.
async fn open_session(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
        .await
        .unwrap();
    response
        .headers()
        .get(IDENTITY_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn send(app: &axum::Router, method: &str, uri: &str, session: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(IDENTITY_HEADER, session)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn login_then_authorized_route_succeeds() {
    let (state, _store) = test_state();
    let app = demo_app(state);
    let session = open_session(&app).await;

    let response = send(&app, "POST", "/login/7", &session).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/account", &session).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "account");
}

#[tokio::test]
async fn logout_returns_session_to_anonymous() {
    let (state, _store) = test_state();
    let app = demo_app(state);
    let session = open_session(&app).await;

    send(&app, "POST", "/login/7", &session).await;
    send(&app, "POST", "/logout", &session).await;

    let response = send(&app, "GET", "/account", &session).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pending_account_is_gated_by_status_set() {
    let (state, _store) = test_state();
    let app = demo_app(state);
    let session = open_session(&app).await;

    send(&app, "POST", "/login/8?status=pending", &session).await;

    // Not allowed where Active is required...
    let response = send(&app, "GET", "/account", &session).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response).await, "no_permissions");

    // ...but fine where Pending is in the allowed set.
    let response = send(&app, "GET", "/onboarding", &session).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blocked_account_gets_distinct_forbidden_code() {
    let (state, _store) = test_state();
    let app = demo_app(state);
    let session = open_session(&app).await;

    send(&app, "POST", "/login/9?blocked=true", &session).await;

    let response = send(&app, "GET", "/account", &session).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response).await, "account_blocked");
}

#[tokio::test]
async fn user_claim_cannot_reach_admin_routes() {
    let (state, _store) = test_state();
    let app = demo_app(state);
    let session = open_session(&app).await;

    send(&app, "POST", "/login/7", &session).await;

    let response = send(&app, "GET", "/admin/reports", &session).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_claim_reaches_admin_routes_only() {
    let (state, _store) = test_state();
    let app = demo_app(state);
    let session = open_session(&app).await;

    send(&app, "POST", "/login-admin/2", &session).await;

    let response = send(&app, "GET", "/admin/reports", &session).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Admin claims are not members of any user status set.
    let response = send(&app, "GET", "/account", &session).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn forced_invalidation_logs_the_user_out() {
    let (state, _store) = test_state();
    let app = demo_app(state.clone());
    let session = open_session(&app).await;

    send(&app, "POST", "/login/42", &session).await;
    let response = send(&app, "GET", "/account", &session).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Out-of-band block event: an admin flags user 42. The session is
    // found through the user index, without knowing its id.
    let invalidated = state
        .sessions()
        .invalidate_user(UserId::new(42))
        .await
        .unwrap();
    assert!(invalidated);

    let response = send(&app, "GET", "/account", &session).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn guest_id_survives_login_and_logout() {
    let (state, _store) = test_state();
    let app = demo_app(state);
    let session = open_session(&app).await;

    let response = send(&app, "GET", "/whoami", &session).await;
    let before: Value = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap(),
    )
    .unwrap();
    let guest_id = before["guest_id"].as_i64().unwrap();

    send(&app, "POST", "/login/7", &session).await;

    let response = send(&app, "GET", "/whoami", &session).await;
    let during: Value = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap(),
    )
    .unwrap();
    assert_eq!(during["user_id"].as_i64().unwrap(), 7);
    assert_eq!(during["guest_id"].as_i64().unwrap(), guest_id);

    send(&app, "POST", "/logout", &session).await;

    let response = send(&app, "GET", "/whoami", &session).await;
    let after: Value = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap(),
    )
    .unwrap();
    assert!(after["user_id"].is_null());
    assert_eq!(after["guest_id"].as_i64().unwrap(), guest_id);
}
