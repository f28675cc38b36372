//! Map parsed command-line arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::Result;
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if a defaulted argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .map(SecretString::from);

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        auth: auth_opts.to_config(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("GROUPS_PORT", Some("9000")),
                ("GROUPS_DSN", Some("postgres://user@localhost:5432/groups")),
                ("GROUPS_SESSION_TTL_SECONDS", Some("3600")),
                ("GROUPS_LOGIN_PATH", Some("/signin")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["groups"]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected a server action");
                };
                assert_eq!(args.port, 9000);
                assert_eq!(
                    args.dsn.as_ref().map(|dsn| dsn.expose_secret().to_string()),
                    Some("postgres://user@localhost:5432/groups".to_string())
                );
                assert_eq!(args.auth.session_ttl_seconds(), 3600);
                assert_eq!(args.auth.login_path(), "/signin");
            },
        );
    }

    #[test]
    fn memory_stores_without_dsn() {
        temp_env::with_vars(
            [("GROUPS_PORT", None::<&str>), ("GROUPS_DSN", None)],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["groups"]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected a server action");
                };
                assert_eq!(args.port, 8080);
                assert!(args.dsn.is_none());
            },
        );
    }
}
