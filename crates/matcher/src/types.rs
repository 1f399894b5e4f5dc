use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Thresholds and limits for pair scoring.
///
/// Scores are fractions in `[0.0, 1.0]`; reports render them as percentages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Pairs scoring below this are not recorded at all.
    pub min_similarity_threshold: f64,
    /// Lower bound of the Medium band.
    pub medium_threshold: f64,
    /// Lower bound of the High band.
    pub high_threshold: f64,
    /// Per-side token cap for the sequence ratio. Longer pages are compared on
    /// their first `sequence_max_tokens` tokens.
    pub sequence_max_tokens: usize,
    /// Seed for token hashing in [`crate::TextFeatures`].
    pub token_seed: u64,
}

impl SimilarityConfig {
    pub fn with_min_similarity(mut self, threshold: f64) -> Self {
        self.min_similarity_threshold = threshold;
        self
    }

    pub fn with_sequence_max_tokens(mut self, max_tokens: usize) -> Self {
        self.sequence_max_tokens = max_tokens;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.min_similarity_threshold) {
            return Err(MatchError::InvalidConfig(
                "min_similarity_threshold must be within [0.0, 1.0]".into(),
            ));
        }
        if !in_unit(self.medium_threshold) || !in_unit(self.high_threshold) {
            return Err(MatchError::InvalidConfig(
                "classification thresholds must be within [0.0, 1.0]".into(),
            ));
        }
        if !(self.min_similarity_threshold <= self.medium_threshold
            && self.medium_threshold <= self.high_threshold)
        {
            return Err(MatchError::InvalidConfig(
                "thresholds must satisfy min_similarity <= medium <= high".into(),
            ));
        }
        if self.sequence_max_tokens == 0 {
            return Err(MatchError::InvalidConfig(
                "sequence_max_tokens must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            min_similarity_threshold: 0.40,
            medium_threshold: 0.70,
            high_threshold: 0.90,
            sequence_max_tokens: 4000,
            token_seed: 0x70C3_11A5_D00D_F00D,
        }
    }
}

/// Confidence band of a recorded pair. Ordered by severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Low,
    Medium,
    High,
    Exact,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Low => "low",
            Classification::Medium => "medium",
            Classification::High => "high",
            Classification::Exact => "exact",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-document status: the most severe classification over its pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStatus {
    #[default]
    Unique,
    Low,
    Medium,
    High,
    Exact,
}

impl From<Classification> for DuplicateStatus {
    fn from(c: Classification) -> Self {
        match c {
            Classification::Low => DuplicateStatus::Low,
            Classification::Medium => DuplicateStatus::Medium,
            Classification::High => DuplicateStatus::High,
            Classification::Exact => DuplicateStatus::Exact,
        }
    }
}

/// The three similarity signals for a pair and their combination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimilarityScores {
    /// MinHash agreement, an estimate of shingle-set Jaccard.
    pub shingle_jaccard: f64,
    /// Exact Jaccard over distinct tokens.
    pub token_jaccard: f64,
    /// Ratcliff/Obershelp ratio over token sequences.
    pub sequence_ratio: f64,
    /// `max` of the three signals.
    pub final_score: f64,
}

impl SimilarityScores {
    pub fn new(shingle_jaccard: f64, token_jaccard: f64, sequence_ratio: f64) -> Self {
        Self {
            shingle_jaccard,
            token_jaccard,
            sequence_ratio,
            final_score: shingle_jaccard.max(token_jaccard).max(sequence_ratio),
        }
    }

    /// Scores for a content-hash match.
    pub fn exact() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// A scored, classified pair stored once under `doc_a < doc_b`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityPair {
    pub doc_a: String,
    pub doc_b: String,
    pub scores: SimilarityScores,
    pub classification: Classification,
}

impl SimilarityPair {
    /// Build a pair, ordering the ids canonically.
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        scores: SimilarityScores,
        classification: Classification,
    ) -> Self {
        let (doc_a, doc_b) = ordered(a.into(), b.into());
        Self {
            doc_a,
            doc_b,
            scores,
            classification,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey {
            a: self.doc_a.clone(),
            b: self.doc_b.clone(),
        }
    }

    /// The id on the other side of the pair from `id`.
    pub fn other(&self, id: &str) -> Option<&str> {
        if self.doc_a == id {
            Some(&self.doc_b)
        } else if self.doc_b == id {
            Some(&self.doc_a)
        } else {
            None
        }
    }
}

/// Canonical (ordered) key of an unordered document pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub a: String,
    pub b: String,
}

impl PairKey {
    pub fn new(x: &str, y: &str) -> Self {
        let (a, b) = ordered(x.to_string(), y.to_string());
        Self { a, b }
    }
}

fn ordered(x: String, y: String) -> (String, String) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

/// Errors produced by the matching layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    #[error("signature length mismatch: {left} vs {right}")]
    SignatureMismatch { left: usize, right: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = SimilarityConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.min_similarity_threshold, 0.40);
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let cfg = SimilarityConfig {
            medium_threshold: 0.95,
            ..Default::default()
        };
        let err = cfg.validate().expect_err("config should be invalid");
        match err {
            MatchError::InvalidConfig(msg) => assert!(msg.contains("min_similarity <= medium")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let cfg = SimilarityConfig::default().with_min_similarity(1.5);
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidConfig(_))));
    }

    #[test]
    fn severity_order() {
        assert!(Classification::Exact > Classification::High);
        assert!(Classification::High > Classification::Medium);
        assert!(Classification::Medium > Classification::Low);
        assert!(DuplicateStatus::Low > DuplicateStatus::Unique);
        assert_eq!(DuplicateStatus::from(Classification::High), DuplicateStatus::High);
    }

    #[test]
    fn final_score_is_max_of_signals() {
        let s = SimilarityScores::new(0.42, 0.61, 0.55);
        assert_eq!(s.final_score, 0.61);
    }

    #[test]
    fn pair_is_stored_in_canonical_order() {
        let p = SimilarityPair::new("b", "a", SimilarityScores::exact(), Classification::Exact);
        assert_eq!((p.doc_a.as_str(), p.doc_b.as_str()), ("a", "b"));
        assert_eq!(p.other("a"), Some("b"));
        assert_eq!(p.other("c"), None);
        assert_eq!(p.key(), PairKey::new("b", "a"));
    }

    #[test]
    fn classification_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Classification::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&DuplicateStatus::Unique).unwrap(), "\"unique\"");
    }
}
