use crate::classify::classify;
use crate::estimator::estimate;
use crate::features::TextFeatures;
use crate::types::{Classification, MatchError, SimilarityConfig, SimilarityPair, SimilarityScores};

/// What the matcher needs to know about a document.
pub trait Comparable {
    fn id(&self) -> &str;
    fn content_hash(&self) -> &str;
    fn signature(&self) -> &[u64];
    fn features(&self) -> &TextFeatures;
}

/// Scores and classifies document pairs.
///
/// Stateless apart from its config, so one instance can be shared by the
/// incremental path and by parallel reconciliation workers.
#[derive(Debug, Clone)]
pub struct Matcher {
    cfg: SimilarityConfig,
}

impl Matcher {
    pub fn new(cfg: SimilarityConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.cfg
    }

    /// Token features for a normalized document under this matcher's config.
    pub fn features_for<S: AsRef<str>>(&self, tokens: &[S]) -> TextFeatures {
        TextFeatures::from_tokens(tokens, self.cfg.token_seed, self.cfg.sequence_max_tokens)
    }

    /// All similarity signals for a pair, without classification.
    pub fn score<D>(&self, a: &D, b: &D) -> Result<SimilarityScores, MatchError>
    where
        D: Comparable + ?Sized,
    {
        let (sa, sb) = (a.signature(), b.signature());
        if sa.len() != sb.len() {
            return Err(MatchError::SignatureMismatch {
                left: sa.len(),
                right: sb.len(),
            });
        }
        Ok(estimate(sa, a.features(), sb, b.features()))
    }

    /// Score and classify a pair.
    ///
    /// Returns `Ok(None)` when the pair falls below the recording threshold.
    /// Pages with equal content hashes short-circuit to an exact pair.
    pub fn compare<D>(&self, a: &D, b: &D) -> Result<Option<SimilarityPair>, MatchError>
    where
        D: Comparable + ?Sized,
    {
        if a.content_hash() == b.content_hash() {
            return Ok(Some(SimilarityPair::new(
                a.id(),
                b.id(),
                SimilarityScores::exact(),
                Classification::Exact,
            )));
        }
        let scores = self.score(a, b)?;
        Ok(classify(scores.final_score, false, &self.cfg)
            .map(|class| SimilarityPair::new(a.id(), b.id(), scores, class)))
    }
}
