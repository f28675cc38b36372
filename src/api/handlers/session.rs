use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::error;

use super::types::SessionResponse;
use crate::api::cookies::extract_session_token;
use crate::auth::AuthService;

#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(auth: Extension<Arc<AuthService>>, headers: HeaderMap) -> impl IntoResponse {
    // Missing cookies are "no session", not an error.
    let Some(token) = extract_session_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match auth.current_user(&token).await {
        Ok(Some(user)) => {
            let response = SessionResponse {
                user_id: user.id.to_string(),
                email: user.email,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
