//! Security utilities for API token generation and hashing.
//!
//! The raw secret exists only in memory at mint time and in the
//! response to the caller; storage holds a SHA-256 digest plus an
//! 8-character display prefix.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Display prefix length persisted alongside the hash.
pub const TOKEN_PREFIX_LEN: usize = 8;

const SECRET_RANDOM_LEN: usize = 32;

/// Generates a fresh token secret: `gwt_` plus 32 random alphanumerics.
pub fn generate_token_secret() -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("gwt_{random}")
}

/// The first characters of a secret, safe to store and display.
pub fn token_prefix(secret: &str) -> String {
    secret.chars().take(TOKEN_PREFIX_LEN).collect()
}

/// Hashes a token secret using SHA-256.
pub fn hash_api_token(secret: &str) -> Vec<u8> {
    Sha256::digest(secret.as_bytes()).to_vec()
}

/// Verifies a token secret against a stored hash using constant-time
/// comparison.
pub fn verify_api_token(secret: &str, stored_hash: &[u8]) -> bool {
    let input_hash = hash_api_token(secret);
    if input_hash.len() != stored_hash.len() {
        return false;
    }
    input_hash.as_slice().ct_eq(stored_hash).into()
}
