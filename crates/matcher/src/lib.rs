//! # Matcher (`matcher`)
//!
//! Scores candidate page pairs and assigns them a confidence band.
//!
//! ## Signals
//!
//! For every candidate pair three signals are computed:
//!
//! - **Shingle Jaccard**: fraction of agreeing MinHash slots.
//! - **Token Jaccard**: exact overlap of distinct normalized tokens.
//! - **Sequence ratio**: Ratcliff/Obershelp similarity over token sequences,
//!   which rewards long shared passages in the same order.
//!
//! The final score is the maximum of the three. Pairs with equal content
//! hashes are always [`Classification::Exact`]; the others are banded into
//! High (>= 0.90), Medium (>= 0.70) and Low (>= 0.40), and anything below
//! the minimum threshold is dropped.
//!
//! ```
//! use matcher::{classify, Classification, SimilarityConfig};
//!
//! let cfg = SimilarityConfig::default();
//! assert_eq!(classify(0.93, false, &cfg), Some(Classification::High));
//! assert_eq!(classify(0.20, false, &cfg), None);
//! ```

pub mod classify;
pub mod engine;
pub mod estimator;
pub mod features;
pub mod types;

pub use crate::classify::{classify, document_status, score_percent};
pub use crate::engine::{Comparable, Matcher};
pub use crate::estimator::{estimate, sequence_ratio, token_jaccard};
pub use crate::features::TextFeatures;
pub use crate::types::{
    Classification, DuplicateStatus, MatchError, PairKey, SimilarityConfig, SimilarityPair,
    SimilarityScores,
};
