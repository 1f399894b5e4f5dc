//! # LSH index
//!
//! Locality-sensitive hashing over MinHash signatures. Each signature is cut
//! into `B` bands of `R` rows; each band is hashed into a [`BucketKey`], and
//! documents that land in the same bucket for any band become comparison
//! candidates. This keeps duplicate detection sub-quadratic: only colliding
//! pairs are ever scored.
//!
//! Band hashing is explicitly seeded, so bucket assignment is reproducible
//! across processes, runs and machines.
//!
//! ```
//! use index::{LshConfig, LshIndex};
//!
//! let mut lsh = LshIndex::new(LshConfig::new(4, 2)).unwrap();
//! let sig: Vec<u64> = (0..8).collect();
//! lsh.insert_signature("https://example.com/a", &sig).unwrap();
//! let keys = lsh.insert_signature("https://example.com/b", &sig).unwrap();
//!
//! let candidates = lsh.candidates("https://example.com/b", &keys);
//! assert_eq!(candidates[0].id, "https://example.com/a");
//! assert_eq!(candidates[0].shared_buckets, 4);
//! ```

mod bucket;
mod config;
mod lsh;

use thiserror::Error;

pub use crate::bucket::{bucket_keys, BucketKey};
pub use crate::config::{candidate_probability, LshConfig};
pub use crate::lsh::{Candidate, LshIndex};

/// Errors raised by the LSH index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("invalid LSH config: {0}")]
    InvalidConfig(String),
    #[error("signature length {got} does not match banding ({expected})")]
    SignatureLength { expected: usize, got: usize },
    #[error("expected {expected} bucket keys, got {got}")]
    BucketCount { expected: usize, got: usize },
    #[error("document {0} is already indexed")]
    DuplicateId(String),
    #[error("index slot space exhausted")]
    Full,
}
