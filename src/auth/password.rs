//! Argon2id password hashing.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _,
    PasswordVerifier, Version,
};
use rand::rngs::OsRng;

/// OWASP baseline: 19 MiB, 2 passes, 1 lane.
pub const DEFAULT_MEMORY_KIB: u32 = 19_456;
pub const DEFAULT_ITERATIONS: u32 = 2;
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Hashes and verifies passwords in PHC string format.
///
/// Keeps one hash of a throwaway password so logins for unknown emails can pay the same
/// verification cost as real ones.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self.argon2.params();
        f.debug_struct("PasswordHasher")
            .field("memory_kib", &params.m_cost())
            .field("iterations", &params.t_cost())
            .field("parallelism", &params.p_cost())
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// # Errors
    /// Returns an error if the cost parameters are out of range for Argon2.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| anyhow!("invalid Argon2 parameters: {err}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut dummy = [0u8; 16];
        rand::RngCore::fill_bytes(&mut OsRng, &mut dummy);
        let dummy_hash = hash_with(&argon2, &dummy)?;

        Ok(Self { argon2, dummy_hash })
    }

    /// # Errors
    /// Returns an error if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String> {
        hash_with(&self.argon2, password.as_bytes())
    }

    /// Malformed hashes verify as `false`.
    #[must_use]
    pub fn verify(&self, password: &str, password_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn one verification against the throwaway hash.
    pub fn verify_dummy(&self, password: &str) {
        std::hint::black_box(self.verify(password, &self.dummy_hash));
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &[u8]) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password, &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?
        .to_string();
    Ok(hash)
}
