//! Configuration and error types for shingling and MinHash signatures.
//!
//! The configuration is free of I/O and environment-dependent state, so a
//! signature is a pure function of `(normalized_tokens, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the shingle + MinHash stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerceptualConfig {
    /// Configuration schema version.
    ///
    /// Any change that can alter a signature must bump this version so
    /// signatures from different sessions are never compared by accident.
    pub version: u32,
    /// Shingle width in tokens.
    pub k: usize,
    /// Number of MinHash permutations, i.e. the signature length.
    pub num_permutations: usize,
    /// Seed for token hashing and permutation keys.
    ///
    /// Two configs with the same seed produce bit-identical signatures for
    /// the same tokens, across processes and machines.
    pub seed: u64,
    /// Compute signature slots on the Rayon pool.
    pub use_parallel: bool,
}

impl PerceptualConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shingle width. Larger widths are stricter about word order.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the number of permutations. Estimator error shrinks as `1/sqrt(P)`.
    pub fn with_permutations(mut self, num_permutations: usize) -> Self {
        self.num_permutations = num_permutations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version < 1 {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.k < 1 {
            return Err(PerceptualError::InvalidConfigK { k: self.k });
        }
        if self.num_permutations < 1 {
            return Err(PerceptualError::InvalidConfigPermutations {
                permutations: self.num_permutations,
            });
        }
        Ok(())
    }
}

impl Default for PerceptualConfig {
    fn default() -> Self {
        Self {
            version: 1,
            k: 5,
            num_permutations: 128,
            seed: 0xF00D_BAAD_F00D_BAAD,
            use_parallel: false,
        }
    }
}

/// Errors returned by the signature stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerceptualError {
    #[error("cannot build a signature from an empty token sequence")]
    EmptyTokens,

    #[error("invalid config: k must be >= 1 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: num_permutations must be >= 1 (got {permutations})")]
    InvalidConfigPermutations { permutations: usize },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },
}
