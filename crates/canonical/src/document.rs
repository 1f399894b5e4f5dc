use serde::{Deserialize, Serialize};

/// Output of the normalizer.
///
/// For a fixed config version and input, every field is deterministic.
///
/// ```rust
/// use canonical::{normalize, NormalizeConfig};
///
/// let doc = normalize("Duplicate CONTENT, detected!", &NormalizeConfig::default()).unwrap();
/// assert_eq!(doc.text, "duplicate content detected");
/// assert_eq!(doc.tokens, vec!["duplicate", "content", "detected"]);
/// assert_eq!(doc.content_hash.len(), 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedText {
    /// Normalized tokens joined by single spaces.
    pub text: String,
    /// Normalized tokens in document order.
    pub tokens: Vec<String>,
    /// Versioned SHA-256 of `text`, hex encoded.
    pub content_hash: String,
    /// Normalization config version that produced this output.
    pub version: u32,
}

impl NormalizedText {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}
