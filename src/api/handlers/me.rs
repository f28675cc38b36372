use axum::response::Json;

use super::types::SessionResponse;
use crate::api::gate::Principal;

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The signed-in user", body = SessionResponse),
        (status = 302, description = "No valid session, redirect to the login page")
    ),
    tag = "auth"
)]
pub async fn me(principal: Principal) -> Json<SessionResponse> {
    Json(SessionResponse {
        user_id: principal.user_id.to_string(),
        email: principal.email,
    })
}
