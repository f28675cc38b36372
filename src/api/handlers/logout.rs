use axum::{
    extract::Extension,
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;

use super::types::LogoutResponse;
use crate::api::cookies::{clear_session_cookie, extract_session_token};
use crate::auth::AuthService;

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth, headers))]
pub async fn logout(auth: Extension<Arc<AuthService>>, headers: HeaderMap) -> impl IntoResponse {
    let response_headers = end_session(&auth, &headers).await;
    (
        StatusCode::OK,
        response_headers,
        Json(LogoutResponse { ok: true }),
    )
}

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 302, description = "Session cleared, redirect to the home page")
    ),
    tag = "auth"
)]
#[instrument(skip(auth, headers))]
pub async fn logout_redirect(
    auth: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let mut response_headers = end_session(&auth, &headers).await;
    response_headers.insert(LOCATION, HeaderValue::from_static("/"));
    (StatusCode::FOUND, response_headers)
}

/// Revoke whatever session the request carries and clear the cookie either way.
async fn end_session(auth: &AuthService, headers: &HeaderMap) -> HeaderMap {
    if let Some(token) = extract_session_token(headers) {
        auth.logout(&token).await;
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    response_headers
}
