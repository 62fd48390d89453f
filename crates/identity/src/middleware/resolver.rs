//! Session resolution middleware.
//!
//! The per-request entry point of the identity layer: reads the identity
//! header, loads or creates the session record, attaches a
//! [`SessionHandle`] to the request, and echoes the (possibly newly
//! generated) session id back on the response so clients stay identified
//! across a stateless, horizontally-scaled tier.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::IdentityError;
use crate::models::Session;
use crate::session::SessionHandle;
use crate::state::IdentityState;

/// Resolve the caller's session for this request.
///
/// Algorithm:
/// 1. If a session is already attached (re-entrant middleware chain), pass
///    through untouched.
/// 2. Read the identity header; absent or empty means a fresh random
///    session id.
/// 3. Load the record from the store. Missing or undeserializable records
///    transparently become a fresh session under the presented id. Store
///    failures are the one thing that aborts: the request cannot proceed
///    without its session.
/// 4. Attach the [`SessionHandle`] (and the token service, for the guards)
///    to the request extensions.
/// 5. Echo the session id on the response - on every response, including
///    errors, except the configured diagnostic allow-list.
pub async fn resolve_session(
    State(state): State<IdentityState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<SessionHandle>().is_some() {
        return next.run(request).await;
    }

    let echo_header = !state.config().is_open_path(request.uri().path());

    let incoming = request
        .headers()
        .get(&state.config().identity_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    let session = match incoming {
        Some(id) => match state.sessions().load(&id).await {
            Ok(Some(session)) => session,
            Ok(None) => Session::new(id),
            Err(e) => {
                let mut response = IdentityError::from(e).into_response();
                set_identity_header(&mut response, &state, &id, echo_header);
                return response;
            }
        },
        None => Session::new(generate_session_id()),
    };

    let session_id = session.session_id.clone();
    let handle = SessionHandle::new(session, state.sessions().clone());
    request.extensions_mut().insert(handle);
    request.extensions_mut().insert(state.tokens().clone());

    let mut response = next.run(request).await;
    set_identity_header(&mut response, &state, &session_id, echo_header);
    response
}

/// Generate a fresh opaque session id.
fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn set_identity_header(
    response: &mut Response,
    state: &IdentityState,
    session_id: &str,
    echo_header: bool,
) {
    if !echo_header {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response
            .headers_mut()
            .insert(state.config().identity_header.clone(), value);
    }
}
