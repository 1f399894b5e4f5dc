//! # Shingle signatures
//!
//! Turns a normalized token stream into a compact, similarity-preserving
//! MinHash signature.
//!
//! ## Contract
//!
//! - Input is the token sequence produced by the normalizer; this crate never
//!   normalizes or tokenizes raw text.
//! - Output is a pure function of `(tokens, config)`: no I/O, no clocks and no
//!   process-randomized hashing. The same tokens and [`PerceptualConfig`]
//!   always give bit-identical signatures.
//!
//! ## Pipeline
//!
//! 1. **Shingling**: every window of `k` consecutive tokens is hashed with a
//!    seeded rolling hash, and the distinct hashes form the shingle set. A
//!    stream shorter than `k` is one shingle.
//! 2. **MinHashing**: `P` keyed permutations are applied to the set and the
//!    minimum under each is kept. The fraction of agreeing slots between two
//!    signatures estimates the Jaccard similarity of their shingle sets.
//!
//! ```
//! use perceptual::{estimate_jaccard, signature_for_tokens, PerceptualConfig};
//!
//! let cfg = PerceptualConfig::default();
//! let a = signature_for_tokens(&["the", "quick", "brown", "fox", "jumps", "over"], &cfg).unwrap();
//! let b = signature_for_tokens(&["the", "quick", "brown", "fox", "jumps", "over"], &cfg).unwrap();
//!
//! assert_eq!(a.minhash.len(), 128);
//! assert_eq!(estimate_jaccard(&a.minhash, &b.minhash), 1.0);
//! ```
pub mod config;
mod minhash;
mod shingles;

use serde::{Deserialize, Serialize};

pub use crate::config::{PerceptualConfig, PerceptualError};
pub use crate::minhash::{estimate_jaccard, minhash_signature, splitmix64};
pub use crate::shingles::{make_shingles_rolling, shingle_set};

/// Current signature algorithm version.
pub const PERCEPTUAL_VERSION: u16 = 1;

/// Human-readable algorithm identifier.
pub const PERCEPTUAL_ALGORITHM: &str = "rolling_shingle+minhash_v1";

/// A document's MinHash signature plus the parameters that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShingleSignature {
    /// Number of distinct shingles the signature summarizes.
    pub shingle_count: usize,
    /// Fixed-length MinHash values, one per permutation.
    pub minhash: Vec<u64>,
    pub meta: SignatureMeta,
}

/// Parameters recorded alongside a signature so incompatible signatures are
/// detectable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureMeta {
    pub perceptual_version: u16,
    pub algorithm_name: String,
    pub k: usize,
    pub num_permutations: usize,
    pub seed: u64,
    pub config_version: u32,
}

/// Compute the shingle set and MinHash signature for a token stream.
pub fn signature_for_tokens<S>(
    tokens: &[S],
    cfg: &PerceptualConfig,
) -> Result<ShingleSignature, PerceptualError>
where
    S: AsRef<str>,
{
    cfg.validate()?;
    if tokens.is_empty() {
        return Err(PerceptualError::EmptyTokens);
    }

    let shingles = shingle_set(tokens, cfg.k, cfg.seed);
    let minhash = minhash_signature(&shingles, cfg.num_permutations, cfg);

    Ok(ShingleSignature {
        shingle_count: shingles.len(),
        minhash,
        meta: SignatureMeta {
            perceptual_version: PERCEPTUAL_VERSION,
            algorithm_name: PERCEPTUAL_ALGORITHM.to_string(),
            k: cfg.k,
            num_permutations: cfg.num_permutations,
            seed: cfg.seed,
            config_version: cfg.version,
        },
    })
}
