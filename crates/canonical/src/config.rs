//! Configuration for the normalizer.
//!
//! The `version` field is part of every content hash. Any change to
//! normalization behavior (even a bug fix) must bump it so that hashes
//! produced under different rules never compare equal.
//!
//! ```rust
//! use canonical::NormalizeConfig;
//!
//! let config = NormalizeConfig::default();
//! assert_eq!(config.version, 1);
//! assert!(config.remove_stopwords);
//! assert_eq!(config.min_token_chars, 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;

/// Switches for the normalization pipeline.
///
/// Serialized form (all fields optional, missing ones take defaults):
///
/// ```json
/// {
///   "version": 1,
///   "normalize_unicode": true,
///   "lowercase": true,
///   "strip_punctuation": true,
///   "strip_entities": true,
///   "remove_stopwords": true,
///   "min_token_chars": 3
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Normalization rules version. Must be >= 1.
    pub version: u32,
    /// Apply Unicode NFKC before anything else.
    pub normalize_unicode: bool,
    /// Locale-free Unicode lowercasing.
    pub lowercase: bool,
    /// Treat every character that is not a letter, digit, mark or `_` as a
    /// token delimiter.
    pub strip_punctuation: bool,
    /// Drop leftover HTML entities (`&amp;`, `&#169;`) before tokenizing.
    pub strip_entities: bool,
    /// Remove common English stopwords.
    pub remove_stopwords: bool,
    /// Drop tokens shorter than this many characters. `0` and `1` keep all.
    pub min_token_chars: usize,
}

impl NormalizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stopwords(mut self, remove_stopwords: bool) -> Self {
        self.remove_stopwords = remove_stopwords;
        self
    }

    pub fn with_min_token_chars(mut self, min_token_chars: usize) -> Self {
        self.min_token_chars = min_token_chars;
        self
    }

    pub fn with_punctuation_stripped(mut self, strip_punctuation: bool) -> Self {
        self.strip_punctuation = strip_punctuation;
        self
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.version == 0 {
            return Err(NormalizeError::InvalidConfig(
                "config version must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            normalize_unicode: true,
            lowercase: true,
            strip_punctuation: true,
            strip_entities: true,
            remove_stopwords: true,
            min_token_chars: 3,
        }
    }
}
