//! Request inspection helpers.
//!
//! # Responsibilities
//! - Read the request id set by the middleware stack
//! - Extract Bearer and Basic credentials
//! - Derive the callback URL handed to the gateway

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Header carrying the per-request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Path the gateway calls back on.
pub const CALLBACK_PATH: &str = "/mvola/callback";

/// Request id assigned by `SetRequestIdLayer`, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = authorization(headers)?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// `(user, password)` from `Authorization: Basic <base64>`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = authorization(headers)?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    if user.is_empty() {
        return None;
    }
    Some((user.to_string(), password.to_string()))
}

/// Callback URL for a transaction: explicit, else public base URL, else the
/// `Host` the caller reached us on.
pub fn callback_url(
    explicit: Option<&str>,
    public_base_url: Option<&str>,
    headers: &HeaderMap,
) -> String {
    if let Some(url) = explicit.map(str::trim).filter(|url| !url.is_empty()) {
        return url.to_string();
    }
    let base = match public_base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{}", host)
        }
    };
    format!("{}{}", base, CALLBACK_PATH)
}

/// First characters of a token, for logs.
pub fn token_prefix(token: &str) -> &str {
    let end = token.char_indices().nth(8).map_or(token.len(), |(i, _)| i);
    &token[..end]
}
