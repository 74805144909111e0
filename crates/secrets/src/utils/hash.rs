//! Hashing helpers for content-addressed names

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`
#[must_use]
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// First `len` hex digits of the SHA-256 of `data`
#[must_use]
pub fn sha256_prefix(data: impl AsRef<[u8]>, len: usize) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(len);
    digest
}
