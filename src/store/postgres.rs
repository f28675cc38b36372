//! PostgreSQL-backed credential and session store.

use super::token::{generate_session_token, hash_session_token};
use super::{CredentialStore, SessionStore, StoreError, User, SESSION_INSERT_ATTEMPTS};
use crate::clock::{duration_to_ms, Clock};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Instrument};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgStore {
    /// Connect a pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the pool cannot reach the database.
    pub async fn connect(dsn: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::from_pool(pool, clock))
    }

    #[must_use]
    pub fn from_pool(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables and indexes if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            debug!("applying schema statement: {statement}");
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to apply schema statement: {statement}"))?;
        }
        Ok(())
    }
}

/// Postgres `unique_violation`.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at_unix_ms: row.try_get("created_at_unix_ms")?,
    })
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn register(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let query = r"
            INSERT INTO users (id, email, password_hash, created_at_unix_ms)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, created_at_unix_ms
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(password_hash)
            .bind(self.clock.now_unix_ms())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(user_from_row(&row)?),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query =
            "SELECT id, email, password_hash, created_at_unix_ms FROM users WHERE email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = "SELECT id, email, password_hash, created_at_unix_ms FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let query = "SELECT COUNT(*) AS total FROM users";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;
        let total: i64 = row.try_get("total")?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let query = "SELECT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create(&self, user_id: Uuid, ttl: Duration) -> Result<String, StoreError> {
        let query = r"
            INSERT INTO user_sessions (session_hash, user_id, created_at_unix_ms, expires_at_unix_ms)
            VALUES ($1, $2, $3, $4)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        let now = self.clock.now_unix_ms();
        let expires_at = now.saturating_add(duration_to_ms(ttl));

        for _ in 0..SESSION_INSERT_ATTEMPTS {
            let token = generate_session_token()?;
            let result = sqlx::query(query)
                .bind(hash_session_token(&token))
                .bind(user_id)
                .bind(now)
                .bind(expires_at)
                .execute(&self.pool)
                .instrument(span.clone())
                .await;

            match result {
                Ok(_) => return Ok(token),
                Err(err) if is_unique_violation(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Err(StoreError::TokenCollision(SESSION_INSERT_ATTEMPTS))
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        let token_hash = hash_session_token(token);
        let now = self.clock.now_unix_ms();

        let query = "SELECT user_id, expires_at_unix_ms FROM user_sessions WHERE session_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let Some(row) = sqlx::query(query)
            .bind(token_hash.as_slice())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?
        else {
            return Ok(None);
        };

        let expires_at: i64 = row.try_get("expires_at_unix_ms")?;
        if now < expires_at {
            return Ok(Some(row.try_get("user_id")?));
        }

        let query = "DELETE FROM user_sessions WHERE session_hash = $1 AND expires_at_unix_ms <= $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash.as_slice())
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(None)
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let query = "DELETE FROM user_sessions WHERE expires_at_unix_ms <= $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(self.clock.now_unix_ms())
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected())
    }
}
