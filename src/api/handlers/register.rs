use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    auth_error_response,
    types::{Credentials, ErrorResponse, MessageResponse},
    CredentialsBody,
};
use crate::auth::AuthService;

pub(crate) const REGISTERED_MESSAGE: &str = "Registration successful! Please login.";

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body(content = Credentials, description = "JSON or form-encoded credentials"),
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Missing payload or invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    auth: Extension<Arc<AuthService>>,
    CredentialsBody(credentials): CredentialsBody,
) -> impl IntoResponse {
    match auth
        .register(&credentials.email, &credentials.password)
        .await
    {
        // No session yet; the client is sent to the login form.
        Ok(_) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                ok: true,
                message: REGISTERED_MESSAGE.to_string(),
            }),
        )
            .into_response(),
        Err(err) => auth_error_response(&err),
    }
}
