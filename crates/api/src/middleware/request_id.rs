//! Request correlation ids.
//!
//! Each request gets a `req_<nanoid>` id unless the caller already sent a
//! usable `X-Request-Id`, in which case that one is kept so logs line up
//! across services. The id is stored as a [`RequestId`] extension for
//! handlers and echoed on every response.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use nanoid::nanoid;

use crate::state::RequestId;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_INBOUND_LEN: usize = 64;

pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| is_acceptable(value))
        .map(str::to_string)
        .unwrap_or_else(|| format!("req_{}", nanoid!(16)));

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut resp = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    resp
}

// Inbound ids end up in logs and error bodies, so only short token-like values pass.
fn is_acceptable(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_INBOUND_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_token_like_ids() {
        assert!(is_acceptable("req_abc123"));
        assert!(is_acceptable("3f2b-9c.1"));
    }

    #[test]
    fn test_rejects_unusable_ids() {
        assert!(!is_acceptable(""));
        assert!(!is_acceptable("has space"));
        assert!(!is_acceptable("quote\"d"));
        assert!(!is_acceptable(&"a".repeat(MAX_INBOUND_LEN + 1)));
    }
}
