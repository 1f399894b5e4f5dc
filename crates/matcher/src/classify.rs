use crate::types::{Classification, DuplicateStatus, SimilarityConfig};

/// Map a final score to its confidence band.
///
/// Equal content hashes are always [`Classification::Exact`]. Otherwise
/// `None` means the pair falls below `min_similarity_threshold` and must not
/// be recorded.
pub fn classify(final_score: f64, exact_hash_match: bool, cfg: &SimilarityConfig) -> Option<Classification> {
    if exact_hash_match {
        return Some(Classification::Exact);
    }
    if final_score >= cfg.high_threshold {
        Some(Classification::High)
    } else if final_score >= cfg.medium_threshold {
        Some(Classification::Medium)
    } else if final_score >= cfg.min_similarity_threshold {
        Some(Classification::Low)
    } else {
        None
    }
}

/// Most severe classification among a document's pairs, or `Unique`.
pub fn document_status<I>(classifications: I) -> DuplicateStatus
where
    I: IntoIterator<Item = Classification>,
{
    classifications
        .into_iter()
        .max()
        .map(DuplicateStatus::from)
        .unwrap_or_default()
}

/// Render a fraction as a percentage rounded to two decimals.
pub fn score_percent(score: f64) -> f64 {
    (score.clamp(0.0, 1.0) * 10_000.0).round() / 100.0
}
