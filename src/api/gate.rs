//! Access gate for routes that need a signed-in user.
//!
//! Anonymous requests (no token, unknown token, expired session, user gone) are answered with
//! `302 Found` to the login path. The reason is not disclosed. The requested path and query
//! ride along in a short-lived cookie so login can send the user back.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{
        header::{LOCATION, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

use super::cookies::{extract_session_token, next_cookie};
use crate::auth::{AuthConfig, AuthService};
use crate::store::User;

/// Identity attached to requests that passed the gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present behind the gate.
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Middleware: let the request through with a [`Principal`], or redirect to login.
pub async fn require_session(
    Extension(auth): Extension<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match extract_session_token(request.headers()) {
        Some(token) => match auth.current_user(&token).await {
            Ok(user) => user,
            Err(err) => {
                error!("Failed to resolve session: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
        None => None,
    };

    let Some(user) = user else {
        debug!(path = %request.uri().path(), "anonymous request to protected route");
        let path_and_query = request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path(), |pq| pq.as_str())
            .to_string();
        return redirect_to_login(auth.config(), &path_and_query);
    };

    request.extensions_mut().insert(Principal::from(&user));
    next.run(request).await
}

fn redirect_to_login(config: &AuthConfig, path_and_query: &str) -> Response {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(config.login_path()) {
        Ok(location) => {
            headers.insert(LOCATION, location);
        }
        Err(err) => {
            error!("Invalid login path {:?}: {err}", config.login_path());
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    if let Ok(cookie) = next_cookie(config, path_and_query) {
        headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::FOUND, headers).into_response()
}
