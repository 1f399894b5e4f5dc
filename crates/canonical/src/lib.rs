//! Text normalization for duplicate-content detection.
//!
//! Turns extracted page text into a deterministic, versioned token sequence
//! so that pages differing only in formatting, casing or punctuation compare
//! as identical.
//!
//! ## What we do
//!
//! - Unicode NFKC normalization
//! - Lowercasing and punctuation/symbol stripping
//! - Leftover HTML entity removal
//! - Whitespace collapsing
//! - Optional stopword and short-token removal
//! - A versioned content hash for exact-duplicate detection
//! - A minimal markup fallback for pages without extracted text
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls, no OS/locale dependence. The same text and config
//! give the same tokens and hash on any machine.
//!
//! Hash = SHA-256(version || 0x00 || normalized_text)

mod config;
mod document;
mod error;
mod hash;
mod markup;
mod pipeline;
mod stopwords;
mod whitespace;

pub use crate::config::NormalizeConfig;
pub use crate::document::NormalizedText;
pub use crate::error::NormalizeError;
pub use crate::hash::hash_normalized_bytes;
pub use crate::markup::visible_text;
pub use crate::pipeline::{normalize, normalize_markup};
pub use crate::stopwords::is_stopword;
pub use crate::whitespace::collapse_whitespace;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_deterministic() {
        let cfg = NormalizeConfig::default();
        let input = "  Reused ARTICLE text,\nsyndicated across sections. ";
        let a = normalize(input, &cfg).unwrap();
        let b = normalize(input, &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.content_hash, hash_normalized_bytes(cfg.version, a.text.as_bytes()));
    }

    #[test]
    fn text_is_tokens_joined_by_space() {
        let out = normalize("Alpha,beta;gamma  delta", &NormalizeConfig::default()).unwrap();
        assert_eq!(out.text, out.tokens.join(" "));
        assert_eq!(out.token_count(), 4);
    }
}
