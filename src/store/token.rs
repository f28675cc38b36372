//! Session token generation and hashing.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Raw entropy per token, in bytes.
pub(crate) const SESSION_TOKEN_BYTES: usize = 32;

/// Create a new session token for the auth cookie.
/// The raw value is only returned to the caller; stores keep a hash.
pub(crate) fn generate_session_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never reach storage.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
