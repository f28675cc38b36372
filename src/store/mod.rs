//! Credential and session storage.
//!
//! Two backends implement the same traits:
//!
//! - **Memory:** `tokio` read/write locks around hash maps. Uniqueness checks and inserts
//!   happen under a single write lock, so concurrent registrations of one email produce exactly
//!   one winner.
//! - **PostgreSQL:** a unique index on `users.email` does the same job; the `23505` unique
//!   violation is mapped to [`StoreError::DuplicateEmail`].
//!
//! Session tokens are never stored. Both backends key sessions by the SHA-256 of the token, so
//! a leaked table does not hand out live sessions.

mod memory;
mod postgres;
mod sweeper;
pub(crate) mod token;

pub use memory::{MemoryCredentialStore, MemorySessionStore};
pub use postgres::PgStore;
pub use sweeper::spawn_session_sweeper;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Attempts made to insert a session before giving up on token collisions.
pub(crate) const SESSION_INSERT_ATTEMPTS: u32 = 3;

/// A registered account.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    /// Normalized (trimmed, lowercased) email.
    pub email: String,
    /// PHC string; never sent to clients.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at_unix_ms: i64,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("created_at_unix_ms", &self.created_at_unix_ms)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to generate session token: {0}")]
    Entropy(#[from] rand::Error),

    #[error("session token collided {0} times in a row")]
    TokenCollision(u32),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user unless the (already normalized) email is taken.
    async fn register(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Mint a fresh token for `user_id` that expires `ttl` from now.
    async fn create(&self, user_id: Uuid, ttl: Duration) -> Result<String, StoreError>;

    /// Return the session owner if the token is known and not yet expired.
    ///
    /// Expired entries are removed as a side effect.
    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, StoreError>;

    /// Remove the session. Unknown tokens are not an error.
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;

    /// Remove every expired session, returning how many were dropped.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_debug_hides_password_hash() {
        let user = User {
            id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at_unix_ms: 0,
        };
        let debug = format!("{user:?}");
        assert!(debug.contains("alice@example.com"));
        assert!(!debug.contains("argon2id"));
    }

    #[test]
    fn user_serialization_skips_password_hash() {
        let user = User {
            id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at_unix_ms: 7,
        };
        let value = serde_json::to_value(&user).ok();
        assert_eq!(
            value
                .as_ref()
                .and_then(|v| v.get("email"))
                .and_then(serde_json::Value::as_str),
            Some("alice@example.com")
        );
        assert!(value.is_some_and(|v| v.get("password_hash").is_none()));
    }
}
