//! Session and return-path cookies.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};

use crate::auth::AuthConfig;

pub const SESSION_COOKIE_NAME: &str = "groups_session";
pub const NEXT_COOKIE_NAME: &str = "groups_next";

/// Lifetime of the return-path cookie set by the access gate.
const NEXT_COOKIE_MAX_AGE_SECONDS: u64 = 5 * 60;

/// Build an `HttpOnly` cookie carrying the session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(
        config,
        SESSION_COOKIE_NAME,
        token,
        config.session_ttl_seconds(),
    )
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(config, SESSION_COOKIE_NAME, "", 0)
}

/// Remember where an anonymous request was headed.
pub(crate) fn next_cookie(
    config: &AuthConfig,
    path_and_query: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let encoded = Base64UrlUnpadded::encode_string(path_and_query.as_bytes());
    build_cookie(
        config,
        NEXT_COOKIE_NAME,
        &encoded,
        NEXT_COOKIE_MAX_AGE_SECONDS,
    )
}

pub(crate) fn clear_next_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(config, NEXT_COOKIE_NAME, "", 0)
}

fn build_cookie(
    config: &AuthConfig,
    name: &str,
    value: &str,
    max_age_seconds: u64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read the session token from a bearer header, falling back to the cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    cookie_value(headers, SESSION_COOKIE_NAME)
}

/// Decode the return path stored by the access gate.
///
/// Only same-site absolute paths are accepted.
pub(crate) fn extract_next_path(headers: &HeaderMap) -> Option<String> {
    let encoded = cookie_value(headers, NEXT_COOKIE_NAME)?;
    let bytes = Base64UrlUnpadded::decode_vec(&encoded).ok()?;
    let path = String::from_utf8(bytes).ok()?;
    is_local_path(&path).then_some(path)
}

fn is_local_path(path: &str) -> bool {
    // Browsers drop tabs and newlines, so "/\t/host" would become "//host".
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    // Browsers may send several Cookie headers over HTTP/2.
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
