use crate::auth::AuthConfig;
use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_SWEEP_SECONDS: &str = "session-sweep-seconds";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_AFTER_LOGIN_PATH: &str = "after-login-path";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_ARGON2_MEMORY_KIB: &str = "argon2-memory-kib";
pub const ARG_ARGON2_ITERATIONS: &str = "argon2-iterations";
pub const ARG_ARGON2_PARALLELISM: &str = "argon2-parallelism";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub session_ttl_seconds: u64,
    pub session_sweep_seconds: u64,
    pub login_path: String,
    pub after_login_path: String,
    pub cookie_secure: bool,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing from `matches`.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing --session-ttl-seconds")?,
            session_sweep_seconds: matches
                .get_one::<u64>(ARG_SESSION_SWEEP_SECONDS)
                .copied()
                .context("missing --session-sweep-seconds")?,
            login_path: matches
                .get_one::<String>(ARG_LOGIN_PATH)
                .cloned()
                .context("missing --login-path")?,
            after_login_path: matches
                .get_one::<String>(ARG_AFTER_LOGIN_PATH)
                .cloned()
                .context("missing --after-login-path")?,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
            argon2_memory_kib: matches
                .get_one::<u32>(ARG_ARGON2_MEMORY_KIB)
                .copied()
                .context("missing --argon2-memory-kib")?,
            argon2_iterations: matches
                .get_one::<u32>(ARG_ARGON2_ITERATIONS)
                .copied()
                .context("missing --argon2-iterations")?,
            argon2_parallelism: matches
                .get_one::<u32>(ARG_ARGON2_PARALLELISM)
                .copied()
                .context("missing --argon2-parallelism")?,
        })
    }

    #[must_use]
    pub fn to_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_session_sweep_seconds(self.session_sweep_seconds)
            .with_login_path(self.login_path.clone())
            .with_after_login_path(self.after_login_path.clone())
            .with_cookie_secure(self.cookie_secure)
            .with_argon2_memory_kib(self.argon2_memory_kib)
            .with_argon2_iterations(self.argon2_iterations)
            .with_argon2_parallelism(self.argon2_parallelism)
    }
}

fn validator_local_path(path: &str) -> std::result::Result<String, String> {
    if path.starts_with('/') && !path.starts_with("//") && !path.chars().any(char::is_control) {
        Ok(path.to_string())
    } else {
        Err("must be a local path starting with '/'".to_string())
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_password_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds, fixed from login")
                .env("GROUPS_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_SWEEP_SECONDS)
                .long(ARG_SESSION_SWEEP_SECONDS)
                .help("Interval between expired session sweeps, 0 disables the sweeper")
                .env("GROUPS_SESSION_SWEEP_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Where anonymous requests to protected routes are redirected")
                .env("GROUPS_LOGIN_PATH")
                .default_value("/login")
                .value_parser(validator_local_path),
        )
        .arg(
            Arg::new(ARG_AFTER_LOGIN_PATH)
                .long(ARG_AFTER_LOGIN_PATH)
                .help("Where a successful login goes when no page was requested first")
                .env("GROUPS_AFTER_LOGIN_PATH")
                .default_value("/groups")
                .value_parser(validator_local_path),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark session cookies Secure (HTTPS only)")
                .env("GROUPS_COOKIE_SECURE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}

fn with_password_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ARGON2_MEMORY_KIB)
                .long(ARG_ARGON2_MEMORY_KIB)
                .help("Argon2id memory cost in KiB")
                .env("GROUPS_ARGON2_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_ARGON2_ITERATIONS)
                .long(ARG_ARGON2_ITERATIONS)
                .help("Argon2id time cost (iterations)")
                .env("GROUPS_ARGON2_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_ARGON2_PARALLELISM)
                .long(ARG_ARGON2_PARALLELISM)
                .help("Argon2id parallelism (lanes)")
                .env("GROUPS_ARGON2_PARALLELISM")
                .default_value("1")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}
