use crate::{
    api,
    auth::{AuthConfig, AuthService},
    cli::telemetry,
    clock::{Clock, SystemClock},
    store::{CredentialStore, MemoryCredentialStore, MemorySessionStore, PgStore, SessionStore},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub auth: AuthConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied, or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (credentials, sessions): (Arc<dyn CredentialStore>, Arc<dyn SessionStore>) =
        if let Some(dsn) = &args.dsn {
            info!("Connecting to database: {}", redact_dsn(dsn.expose_secret()));

            let store = PgStore::connect(dsn.expose_secret(), clock).await?;
            store
                .migrate()
                .await
                .context("Failed to apply database schema")?;

            let store = Arc::new(store);
            let credentials: Arc<dyn CredentialStore> = store.clone();
            let sessions: Arc<dyn SessionStore> = store;
            (credentials, sessions)
        } else {
            warn!("No database configured, users and sessions are kept in memory");
            let credentials: Arc<dyn CredentialStore> =
                Arc::new(MemoryCredentialStore::new(Arc::clone(&clock)));
            let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(clock));
            (credentials, sessions)
        };

    let auth = AuthService::new(credentials, sessions, args.auth)?;

    match auth.user_count().await {
        Ok(count) => info!("Registered users: {count}"),
        Err(err) => warn!("Failed to count registered users: {err}"),
    }

    let result = api::new(args.port, Arc::new(auth)).await;

    telemetry::shutdown_tracer();

    result
}

/// Hide the password in a DSN before logging it.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<invalid dsn>".to_string(),
    }
}
