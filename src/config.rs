//! YAML configuration for the duplicate-detection engine.
//!
//! Every tunable of a session lives in one [`EngineConfig`]. Stage configs
//! (`NormalizeConfig`, `PerceptualConfig`, `LshConfig`, `SimilarityConfig`)
//! are derived from it, so the permutation count and the LSH banding can
//! never disagree.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "blog crawl"
//!
//! shingle_width: 5
//! num_permutations: 128
//! num_bands: 16
//! rows_per_band: 8
//! max_similarity_comparisons: 50
//! min_similarity_threshold: 0.40
//! min_token_count: 10
//! queue_capacity: 1024
//! drift_epsilon: 0.005
//! reconcile_threads: 4
//! seed: 17297687000019483309
//!
//! normalize:
//!   lowercase: true
//!   remove_stopwords: true
//!   min_token_chars: 3
//! ```

use std::fs;
use std::path::Path;

use canonical::NormalizeConfig;
use index::LshConfig;
use matcher::SimilarityConfig;
use perceptual::{splitmix64, PerceptualConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LSH_SEED_SALT: u64 = 0x4C53_485F_4241_4E44;
const TOKEN_SEED_SALT: u64 = 0x544F_4B45_4E5F_5345;

/// Errors that can occur when loading or validating engine configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// All parameters of one duplicate-detection session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    pub name: Option<String>,

    /// Shingle width `k` in tokens.
    pub shingle_width: usize,

    /// MinHash signature length `P`. Must equal `num_bands * rows_per_band`.
    pub num_permutations: usize,

    pub num_bands: usize,
    pub rows_per_band: usize,

    /// Per-page scoring budget during the incremental pass.
    pub max_similarity_comparisons: usize,

    /// Pairs scoring below this fraction are never recorded.
    pub min_similarity_threshold: f64,
    pub medium_threshold: f64,
    pub high_threshold: f64,

    /// Per-side token cap for the sequence ratio.
    pub sequence_max_tokens: usize,

    /// Pages with fewer normalized tokens are excluded from detection.
    pub min_token_count: usize,

    /// Bound of the crawl → engine handoff queue.
    pub queue_capacity: usize,

    /// Provisional/final score disagreement above this is reported as drift.
    pub drift_epsilon: f64,

    /// Dedicated reconciliation pool size. `None` uses the global Rayon pool.
    pub reconcile_threads: Option<usize>,

    /// Master seed. Shingle, permutation, band and token hashes derive from it.
    pub seed: u64,

    /// Compute MinHash slots in parallel. Output is bit-identical either way.
    pub use_parallel: bool,

    pub normalize: NormalizeConfig,
}

impl EngineConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_min_token_count(mut self, min_token_count: usize) -> Self {
        self.min_token_count = min_token_count;
        self
    }

    pub fn with_max_similarity_comparisons(mut self, max: usize) -> Self {
        self.max_similarity_comparisons = max;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_reconcile_threads(mut self, threads: usize) -> Self {
        self.reconcile_threads = Some(threads);
        self
    }

    /// Validate the configuration and every derived stage config.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.normalize
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("normalize: {err}")))?;
        self.perceptual_config()
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("shingles: {err}")))?;
        self.lsh_config()
            .validate_for(self.num_permutations)
            .map_err(|err| ConfigLoadError::Validation(format!("lsh: {err}")))?;
        self.similarity_config()
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("similarity: {err}")))?;

        if self.max_similarity_comparisons == 0 {
            return Err(ConfigLoadError::Validation(
                "max_similarity_comparisons must be >= 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigLoadError::Validation(
                "queue_capacity must be >= 1".to_string(),
            ));
        }
        if !(self.drift_epsilon.is_finite() && self.drift_epsilon >= 0.0) {
            return Err(ConfigLoadError::Validation(
                "drift_epsilon must be a non-negative number".to_string(),
            ));
        }
        if self.reconcile_threads == Some(0) {
            return Err(ConfigLoadError::Validation(
                "reconcile_threads must be >= 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn perceptual_config(&self) -> PerceptualConfig {
        PerceptualConfig::new()
            .with_k(self.shingle_width)
            .with_permutations(self.num_permutations)
            .with_seed(self.seed)
            .with_parallel(self.use_parallel)
    }

    pub fn lsh_config(&self) -> LshConfig {
        LshConfig::new(self.num_bands, self.rows_per_band)
            .with_seed(splitmix64(self.seed ^ LSH_SEED_SALT))
    }

    pub fn similarity_config(&self) -> SimilarityConfig {
        SimilarityConfig {
            min_similarity_threshold: self.min_similarity_threshold,
            medium_threshold: self.medium_threshold,
            high_threshold: self.high_threshold,
            sequence_max_tokens: self.sequence_max_tokens,
            token_seed: splitmix64(self.seed ^ TOKEN_SEED_SALT),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let similarity = SimilarityConfig::default();
        let lsh = LshConfig::default();
        Self {
            version: "1.0".to_string(),
            name: None,
            shingle_width: 5,
            num_permutations: lsh.num_bands * lsh.rows_per_band,
            num_bands: lsh.num_bands,
            rows_per_band: lsh.rows_per_band,
            max_similarity_comparisons: 50,
            min_similarity_threshold: similarity.min_similarity_threshold,
            medium_threshold: similarity.medium_threshold,
            high_threshold: similarity.high_threshold,
            sequence_max_tokens: similarity.sequence_max_tokens,
            min_token_count: 10,
            queue_capacity: 1024,
            drift_epsilon: 0.005,
            reconcile_threads: None,
            seed: PerceptualConfig::default().seed,
            use_parallel: false,
            normalize: NormalizeConfig::default(),
        }
    }
}
