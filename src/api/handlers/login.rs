use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    auth_error_response,
    types::{Credentials, ErrorResponse, LoginResponse},
    CredentialsBody,
};
use crate::api::cookies::{clear_next_cookie, extract_next_path, session_cookie};
use crate::auth::AuthService;

pub(crate) const LOGGED_IN_MESSAGE: &str = "Login successful!";

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = Credentials, description = "JSON or form-encoded credentials"),
    responses(
        (status = 200, description = "Session created, cookie set", body = LoginResponse),
        (status = 400, description = "Missing payload", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    auth: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    CredentialsBody(credentials): CredentialsBody,
) -> impl IntoResponse {
    let login = match auth.login(&credentials.email, &credentials.password).await {
        Ok(login) => login,
        Err(err) => return auth_error_response(&err),
    };

    let token = login.token.expose_secret();
    let mut response_headers = HeaderMap::new();
    match session_cookie(auth.config(), token) {
        Ok(cookie) => {
            response_headers.append(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            auth.logout(token).await;
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    // Send the user back to the protected page that bounced them, if any.
    let redirect = match extract_next_path(&headers) {
        Some(path) => {
            if let Ok(cookie) = clear_next_cookie(auth.config()) {
                response_headers.append(SET_COOKIE, cookie);
            }
            path
        }
        None => auth.config().after_login_path().to_string(),
    };

    let body = LoginResponse {
        ok: true,
        message: LOGGED_IN_MESSAGE.to_string(),
        token: token.to_string(),
        redirect,
        expires_in: login.expires_in.as_secs(),
    };
    (StatusCode::OK, response_headers, Json(body)).into_response()
}
