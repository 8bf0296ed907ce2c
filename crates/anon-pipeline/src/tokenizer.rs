//! Keyed one-way tokens for sensitive values

use anon_common::{AnonError, Result};
use sha2::{Digest, Sha256};

/// Length of every token, in hex characters
pub const TOKEN_LEN: usize = 16;

/// Deterministic keyed tokenizer
///
/// A token is the first [`TOKEN_LEN`] hex characters of `SHA-256(key || value)`.
/// Tokens only contain `[0-9a-f]`, so they never need CSV quoting.
#[derive(Clone)]
pub struct Tokenizer {
    // Hasher already fed with the key; cloned per value
    seeded: Sha256,
}

impl Tokenizer {
    /// Create a tokenizer from a non-empty secret key
    pub fn new(key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(AnonError::config("tokenization key must not be empty"));
        }

        let mut seeded = Sha256::new();
        seeded.update(key.as_bytes());
        Ok(Self { seeded })
    }

    /// Replace `value` with its token
    pub fn tokenize(&self, value: &str) -> String {
        let mut hasher = self.seeded.clone();
        hasher.update(value.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..TOKEN_LEN / 2])
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer").field("key", &"<redacted>").finish()
    }
}
