//! Caller identity propagation to sibling services.
//!
//! When the REST tier calls a sibling data or payment service, the caller's
//! identity travels in a dedicated internal header - separate from the
//! public identity header - so downstream services can attribute writes
//! without re-deriving session state.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::models::CustomerIds;

/// Render the internal caller header value: `user:{id}` when the session is
/// authenticated, `guest:{id}` otherwise.
///
/// Returns `None` for a session with no attribution at all (neither id
/// resolved).
#[must_use]
pub fn caller_header_value(ids: &CustomerIds) -> Option<HeaderValue> {
    let rendered = ids
        .user_id
        .map(|id| format!("user:{id}"))
        .or_else(|| ids.guest_id.map(|id| format!("guest:{id}")))?;
    HeaderValue::from_str(&rendered).ok()
}

/// Set the internal caller header on an outbound request's headers.
pub fn apply_caller_header(headers: &mut HeaderMap, name: &HeaderName, ids: &CustomerIds) {
    if let Some(value) = caller_header_value(ids) {
        headers.insert(name.clone(), value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wayfarer_core::{GuestId, UserId};

    #[test]
    fn test_user_id_takes_precedence() {
        let ids = CustomerIds {
            user_id: Some(UserId::new(42)),
            guest_id: Some(GuestId::new(1_234_567_890_123)),
        };
        assert_eq!(caller_header_value(&ids).unwrap(), "user:42");
    }

    #[test]
    fn test_guest_fallback() {
        let ids = CustomerIds {
            user_id: None,
            guest_id: Some(GuestId::new(1_234_567_890_123)),
        };
        assert_eq!(caller_header_value(&ids).unwrap(), "guest:1234567890123");
    }

    #[test]
    fn test_no_attribution_yields_no_header() {
        let ids = CustomerIds {
            user_id: None,
            guest_id: None,
        };
        assert!(caller_header_value(&ids).is_none());

        let mut headers = HeaderMap::new();
        apply_caller_header(&mut headers, &HeaderName::from_static("x-wayfarer-caller"), &ids);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_apply_sets_header() {
        let ids = CustomerIds {
            user_id: Some(UserId::new(7)),
            guest_id: None,
        };
        let mut headers = HeaderMap::new();
        let name = HeaderName::from_static("x-wayfarer-caller");
        apply_caller_header(&mut headers, &name, &ids);
        assert_eq!(headers.get(&name).unwrap(), "user:7");
    }
}
