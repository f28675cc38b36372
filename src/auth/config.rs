use std::time::Duration;

use super::password::{DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_SESSION_SWEEP_SECONDS: u64 = 5 * 60;
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_AFTER_LOGIN_PATH: &str = "/groups";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: u64,
    session_sweep_seconds: u64,
    login_path: String,
    after_login_path: String,
    cookie_secure: bool,
    argon2_memory_kib: u32,
    argon2_iterations: u32,
    argon2_parallelism: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_sweep_seconds: DEFAULT_SESSION_SWEEP_SECONDS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            after_login_path: DEFAULT_AFTER_LOGIN_PATH.to_string(),
            cookie_secure: false,
            argon2_memory_kib: DEFAULT_MEMORY_KIB,
            argon2_iterations: DEFAULT_ITERATIONS,
            argon2_parallelism: DEFAULT_PARALLELISM,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// `0` disables the background sweeper.
    #[must_use]
    pub fn with_session_sweep_seconds(mut self, seconds: u64) -> Self {
        self.session_sweep_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: String) -> Self {
        self.login_path = path;
        self
    }

    #[must_use]
    pub fn with_after_login_path(mut self, path: String) -> Self {
        self.after_login_path = path;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_argon2_memory_kib(mut self, memory_kib: u32) -> Self {
        self.argon2_memory_kib = memory_kib;
        self
    }

    #[must_use]
    pub fn with_argon2_iterations(mut self, iterations: u32) -> Self {
        self.argon2_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_argon2_parallelism(mut self, parallelism: u32) -> Self {
        self.argon2_parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    /// `None` when sweeping is disabled.
    #[must_use]
    pub fn session_sweep_interval(&self) -> Option<Duration> {
        (self.session_sweep_seconds > 0).then(|| Duration::from_secs(self.session_sweep_seconds))
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn after_login_path(&self) -> &str {
        &self.after_login_path
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn argon2_memory_kib(&self) -> u32 {
        self.argon2_memory_kib
    }

    #[must_use]
    pub fn argon2_iterations(&self) -> u32 {
        self.argon2_iterations
    }

    #[must_use]
    pub fn argon2_parallelism(&self) -> u32 {
        self.argon2_parallelism
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl(), Duration::from_secs(86_400));
        assert_eq!(
            config.session_sweep_interval(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(config.login_path(), "/login");
        assert_eq!(config.after_login_path(), "/groups");
        assert!(!config.cookie_secure());
        assert_eq!(config.argon2_memory_kib(), 19_456);
        assert_eq!(config.argon2_iterations(), 2);
        assert_eq!(config.argon2_parallelism(), 1);
    }

    #[test]
    fn builder_overrides() {
        let config = AuthConfig::new()
            .with_session_ttl_seconds(60)
            .with_session_sweep_seconds(0)
            .with_login_path("/signin".to_string())
            .with_after_login_path("/home".to_string())
            .with_cookie_secure(true)
            .with_argon2_memory_kib(4096)
            .with_argon2_iterations(3)
            .with_argon2_parallelism(2);

        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.session_sweep_interval(), None);
        assert_eq!(config.login_path(), "/signin");
        assert_eq!(config.after_login_path(), "/home");
        assert!(config.cookie_secure());
        assert_eq!(config.argon2_memory_kib(), 4096);
        assert_eq!(config.argon2_iterations(), 3);
        assert_eq!(config.argon2_parallelism(), 2);
    }
}
