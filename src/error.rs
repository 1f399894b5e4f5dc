use canonical::NormalizeError;
use index::IndexError;
use matcher::MatchError;
use perceptual::PerceptualError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigLoadError;

/// Errors that can occur while running a duplicate-detection session.
///
/// None of these abort a crawl: the session keeps every document admitted
/// before the failure, and callers decide whether to continue.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("normalization failure: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("signature generation failed: {0}")]
    Perceptual(#[from] PerceptualError),

    #[error("lsh index error: {0}")]
    Index(#[from] IndexError),

    #[error("similarity scoring failed: {0}")]
    Match(#[from] MatchError),

    #[error("document {0} was already processed in this session")]
    DuplicateDocument(String),

    #[error("reconciliation pool could not be started: {0}")]
    ThreadPool(String),

    #[error("similarity pipeline is closed")]
    PipelineClosed,

    #[error("similarity pipeline task failed: {0}")]
    PipelineTask(String),
}

/// Why a page takes no part in duplicate detection.
///
/// Excluded pages are never indexed and never reported as duplicate or
/// unique; they are listed separately in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Nothing usable survived text extraction and normalization.
    ExtractionFailure { message: String },
    /// Fewer normalized tokens than the configured minimum.
    InsufficientContent {
        token_count: usize,
        min_token_count: usize,
    },
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::ExtractionFailure { message } => {
                write!(f, "extraction failure: {message}")
            }
            ExclusionReason::InsufficientContent {
                token_count,
                min_token_count,
            } => write!(
                f,
                "insufficient content: {token_count} tokens, need {min_token_count}"
            ),
        }
    }
}
