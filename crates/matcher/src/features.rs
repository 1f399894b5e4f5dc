use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Token-level view of a document used by the exact similarity signals.
///
/// Tokens are stored as seeded 64-bit hashes: sequence comparison and set
/// overlap only need equality, and hashes keep per-document memory flat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFeatures {
    /// Token hashes in document order, capped at the sequence limit.
    pub sequence: Vec<u64>,
    /// Distinct token hashes over the whole document.
    pub token_set: HashSet<u64>,
}

impl TextFeatures {
    /// Build features from normalized tokens.
    ///
    /// `sequence_max_tokens` bounds the sequence kept for the Ratcliff/Obershelp
    /// ratio; the token set always covers the full document.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], seed: u64, sequence_max_tokens: usize) -> Self {
        let mut sequence = Vec::with_capacity(tokens.len().min(sequence_max_tokens));
        let mut token_set = HashSet::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let h = xxh3_64_with_seed(token.as_ref().as_bytes(), seed);
            if i < sequence_max_tokens {
                sequence.push(h);
            }
            token_set.insert(h);
        }
        Self {
            sequence,
            token_set,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token_set.is_empty()
    }
}
