//! Session transport: the signed token travels in the `token` cookie.

use axum::http::{header, HeaderMap};

pub const SESSION_COOKIE: &str = "token";

/// `Set-Cookie` value for a freshly issued token. Never readable by page
/// scripts; `Secure` only when serving over production TLS.
pub fn build_session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut parts = vec![
        format!("{}={}", SESSION_COOKIE, token),
        "HttpOnly".to_string(),
        "Path=/".to_string(),
        format!("Max-Age={}", max_age_secs),
        "SameSite=Lax".to_string(),
    ];
    if secure {
        parts.push("Secure".to_string());
    }
    parts.join("; ")
}

/// Reads the session token from the raw `Cookie` header(s). A missing
/// cookie means the caller is anonymous.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, SESSION_COOKIE)
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
