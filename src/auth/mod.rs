//! Registration, login, logout and session resolution.
//!
//! [`AuthService`] ties a [`CredentialStore`], a [`SessionStore`] and a [`PasswordHasher`]
//! together. It knows nothing about HTTP; the `api` module maps its results onto responses
//! and cookies.
//!
//! Flow:
//! - `register` normalizes the email, validates input, hashes the password on the blocking
//!   pool and inserts the user. Duplicate emails fail with [`AuthError::DuplicateEmail`].
//! - `login` looks the user up and verifies the password. Unknown emails still pay for one
//!   Argon2 verification and fail with the same [`AuthError::InvalidCredentials`] as a wrong
//!   password.
//! - `logout` revokes the session and never fails from the caller's point of view.
//! - `current_user` resolves a token to a user, or `None`.

mod config;
mod error;
mod password;
pub mod utils;

pub use config::AuthConfig;
pub use error::{AuthError, ValidationError};
pub use password::{PasswordHasher, DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM};

use crate::clock::Clock;
use crate::store::{
    CredentialStore, MemoryCredentialStore, MemorySessionStore, SessionStore, StoreError, User,
};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use utils::{normalize_email, validate_credentials};

/// A successful login.
#[derive(Debug)]
pub struct Login {
    /// Raw session token. Hand it to the client and drop it.
    pub token: SecretString,
    pub user: User,
    pub expires_in: Duration,
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<PasswordHasher>,
    config: AuthConfig,
}

impl AuthService {
    /// # Errors
    /// Returns an error if the Argon2 parameters in `config` are invalid.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        config: AuthConfig,
    ) -> Result<Self> {
        let hasher = PasswordHasher::new(
            config.argon2_memory_kib(),
            config.argon2_iterations(),
            config.argon2_parallelism(),
        )?;

        Ok(Self {
            credentials,
            sessions,
            hasher: Arc::new(hasher),
            config,
        })
    }

    /// Service over fresh in-memory stores.
    ///
    /// # Errors
    /// Returns an error if the Argon2 parameters in `config` are invalid.
    pub fn in_memory(config: AuthConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::new(
            Arc::new(MemoryCredentialStore::new(Arc::clone(&clock))),
            Arc::new(MemorySessionStore::new(clock)),
            config,
        )
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.sessions)
    }

    /// # Errors
    /// Returns [`AuthError::Validation`] for malformed input before touching the store,
    /// [`AuthError::DuplicateEmail`] if the normalized email is taken.
    #[instrument(skip_all)]
    pub async fn register(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        let email = normalize_email(email);
        validate_credentials(&email, password.expose_secret())?;

        let password_hash = self.hash_password(password).await?;
        let user = self.credentials.register(&email, &password_hash).await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a wrong password.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Login, AuthError> {
        let email = normalize_email(email);
        let user = self.credentials.find_by_email(&email).await?;

        let stored_hash = user.as_ref().map(|user| user.password_hash.clone());
        let verified = self.verify_password(password, stored_hash).await?;

        let Some(user) = user.filter(|_| verified) else {
            debug!("login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let expires_in = self.config.session_ttl();
        let token = self.sessions.create(user.id, expires_in).await?;

        info!(user_id = %user.id, "user logged in");
        Ok(Login {
            token: SecretString::from(token),
            user,
            expires_in,
        })
    }

    /// Revoke the session behind `token`. Store failures are logged, not returned.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) {
        if let Err(err) = self.sessions.revoke(token).await {
            error!("Failed to revoke session: {err}");
        }
    }

    /// Resolve `token` to its user.
    ///
    /// Unknown, expired and orphaned sessions are all `None`.
    ///
    /// # Errors
    /// Returns [`AuthError::StoreUnavailable`] if a store cannot be reached.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        let Some(user_id) = self.sessions.resolve(token).await? else {
            return Ok(None);
        };

        let user = self.credentials.find_by_id(user_id).await?;
        if user.is_none() {
            debug!(%user_id, "session refers to a missing user");
        }
        Ok(user)
    }

    /// # Errors
    /// Returns the credential store's error if it is not reachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.credentials.ping().await
    }

    /// # Errors
    /// Returns the credential store's error if it is not reachable.
    pub async fn user_count(&self) -> Result<u64, StoreError> {
        self.credentials.count().await
    }

    async fn hash_password(&self, password: &SecretString) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = SecretString::from(password.expose_secret().to_owned());

        tokio::task::spawn_blocking(move || hasher.hash(password.expose_secret()))
            .await
            .map_err(|err| AuthError::Hashing(err.to_string()))?
            .map_err(|err| AuthError::Hashing(err.to_string()))
    }

    /// Verify against `stored_hash`, or against the dummy hash when there is none.
    async fn verify_password(
        &self,
        password: &SecretString,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = SecretString::from(password.expose_secret().to_owned());

        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(password.expose_secret(), &hash),
            None => {
                hasher.verify_dummy(password.expose_secret());
                false
            }
        })
        .await
        .map_err(|err| AuthError::Hashing(err.to_string()))
    }
}
