//! Route handlers and shared response helpers.

pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod register;
pub mod session;
pub mod types;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use tracing::error;

use crate::auth::AuthError;
use types::{Credentials, ErrorResponse};

pub(crate) const MISSING_PAYLOAD: &str = "Missing payload";
const INTERNAL_ERROR: &str = "Internal server error";

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorResponse {
        ok: false,
        error: message.to_string(),
    };
    (status, Json(body)).into_response()
}

pub(crate) fn missing_payload() -> Response {
    error_response(StatusCode::BAD_REQUEST, MISSING_PAYLOAD)
}

/// Map a service error to a status and a body safe to show the client.
pub(crate) fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::Validation(_) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
        AuthError::DuplicateEmail => error_response(StatusCode::CONFLICT, &err.to_string()),
        AuthError::InvalidCredentials => {
            error_response(StatusCode::UNAUTHORIZED, &err.to_string())
        }
        AuthError::StoreUnavailable(_) | AuthError::Hashing(_) => {
            error!("{err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

/// Credentials posted either as JSON or as an HTML form.
///
/// Anything that is neither, or does not parse, is rejected with "Missing payload".
pub struct CredentialsBody(pub Credentials);

#[async_trait]
impl<S> FromRequest<S> for CredentialsBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let credentials = if is_form(&req) {
            Form::<Credentials>::from_request(req, state)
                .await
                .map(|Form(credentials)| credentials)
                .ok()
        } else {
            Json::<Credentials>::from_request(req, state)
                .await
                .map(|Json(credentials)| credentials)
                .ok()
        };

        credentials.map(Self).ok_or_else(missing_payload)
    }
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}
