//! Content hashing for normalized text.
//!
//! ```text
//! SHA-256(version.to_be_bytes() || 0x00 || normalized_text_bytes)
//! ```
//!
//! The normalization version is part of the digest so that texts normalized
//! under different rules never produce the same content hash.

use sha2::{Digest, Sha256};

/// Versioned content hash of normalized text.
///
/// ```rust
/// use canonical::hash_normalized_bytes;
///
/// assert_ne!(
///     hash_normalized_bytes(1, b"hello world"),
///     hash_normalized_bytes(2, b"hello world"),
/// );
/// ```
pub fn hash_normalized_bytes(version: u32, normalized: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.to_be_bytes());
    hasher.update([0]);
    hasher.update(normalized);
    hex::encode(hasher.finalize())
}
