//! End-to-end authentication scenarios through the library API, over in-memory stores and a
//! manually driven clock.

use anyhow::Result;
use groups::auth::{AuthConfig, AuthError, AuthService, ValidationError};
use groups::clock::ManualClock;
use groups::store::{CredentialStore, MemoryCredentialStore, MemorySessionStore, SessionStore};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

const START_MS: i64 = 1_700_000_000_000;

fn config() -> AuthConfig {
    AuthConfig::new()
        .with_argon2_memory_kib(1024)
        .with_argon2_iterations(1)
}

fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

struct Harness {
    clock: Arc<ManualClock>,
    credentials: Arc<MemoryCredentialStore>,
    sessions: Arc<MemorySessionStore>,
    auth: AuthService,
}

fn harness() -> Result<Harness> {
    let clock = Arc::new(ManualClock::new(START_MS));
    let credentials = Arc::new(MemoryCredentialStore::new(clock.clone()));
    let sessions = Arc::new(MemorySessionStore::new(clock.clone()));
    let auth = AuthService::new(
        credentials.clone() as Arc<dyn CredentialStore>,
        sessions.clone() as Arc<dyn SessionStore>,
        config(),
    )?;
    Ok(Harness {
        clock,
        credentials,
        sessions,
        auth,
    })
}

#[tokio::test]
async fn register_login_and_resolve() -> Result<()> {
    let h = harness()?;

    let user = h
        .auth
        .register("test@example.com", &password("password123"))
        .await?;
    assert_eq!(user.email, "test@example.com");
    assert_ne!(user.password_hash, "password123");

    let login = h
        .auth
        .login("test@example.com", &password("password123"))
        .await?;
    assert_eq!(login.user.id, user.id);
    assert_eq!(login.expires_in, Duration::from_secs(24 * 60 * 60));

    let current = h.auth.current_user(login.token.expose_secret()).await?;
    assert_eq!(current.map(|u| u.id), Some(user.id));
    Ok(())
}

#[tokio::test]
async fn duplicate_email_after_normalization() -> Result<()> {
    let h = harness()?;

    h.auth
        .register("dup@example.com", &password("password123"))
        .await?;
    let second = h
        .auth
        .register("  DUP@Example.com ", &password("another-password"))
        .await;
    assert!(matches!(second, Err(AuthError::DuplicateEmail)));
    assert_eq!(h.credentials.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn invalid_input_never_reaches_the_store() -> Result<()> {
    let h = harness()?;

    let bad_email = h.auth.register("not-an-email", &password("password123")).await;
    assert!(matches!(
        bad_email,
        Err(AuthError::Validation(ValidationError::InvalidEmail))
    ));

    let short = h.auth.register("short@example.com", &password("1234567")).await;
    assert!(matches!(
        short,
        Err(AuthError::Validation(ValidationError::PasswordTooShort))
    ));

    assert_eq!(h.credentials.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> Result<()> {
    let h = harness()?;
    h.auth
        .register("test@example.com", &password("password123"))
        .await?;

    let wrong = h
        .auth
        .login("test@example.com", &password("wrong-password"))
        .await;
    let unknown = h
        .auth
        .login("nobody@example.com", &password("password123"))
        .await;

    let wrong = wrong.err().map(|err| err.to_string());
    let unknown = unknown.err().map(|err| err.to_string());
    assert_eq!(wrong, Some("Invalid email or password".to_string()));
    assert_eq!(wrong, unknown);
    assert!(h.sessions.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn session_expires_after_ttl() -> Result<()> {
    let h = harness()?;
    h.auth
        .register("test@example.com", &password("password123"))
        .await?;
    let login = h
        .auth
        .login("test@example.com", &password("password123"))
        .await?;
    let token = login.token.expose_secret().to_string();

    h.clock.advance(login.expires_in - Duration::from_millis(1));
    assert!(h.auth.current_user(&token).await?.is_some());

    h.clock.advance(Duration::from_millis(1));
    assert!(h.auth.current_user(&token).await?.is_none());
    assert!(h.sessions.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_only_that_session() -> Result<()> {
    let h = harness()?;
    h.auth
        .register("test@example.com", &password("password123"))
        .await?;

    let first = h
        .auth
        .login("test@example.com", &password("password123"))
        .await?;
    let second = h
        .auth
        .login("test@example.com", &password("password123"))
        .await?;
    assert_ne!(first.token.expose_secret(), second.token.expose_secret());

    h.auth.logout(first.token.expose_secret()).await;
    h.auth.logout(first.token.expose_secret()).await;

    assert!(h
        .auth
        .current_user(first.token.expose_secret())
        .await?
        .is_none());
    assert!(h
        .auth
        .current_user(second.token.expose_secret())
        .await?
        .is_some());
    Ok(())
}

#[tokio::test]
async fn session_for_a_missing_user_resolves_to_nobody() -> Result<()> {
    let h = harness()?;
    let token = h
        .sessions
        .create(uuid::Uuid::new_v4(), Duration::from_secs(60))
        .await?;

    assert!(h.auth.current_user(&token).await?.is_none());
    Ok(())
}
