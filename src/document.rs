//! Pages as handed over by the crawler, and the immutable similarity record
//! the engine derives from each one.

use std::time::Instant;

use canonical::{NormalizeConfig, NormalizeError, NormalizedText, normalize, normalize_markup};
use index::{BucketKey, LshConfig, bucket_keys};
use matcher::{Comparable, Matcher, TextFeatures};
use perceptual::{PerceptualConfig, signature_for_tokens};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, ExclusionReason};

/// Content of one crawled page.
///
/// Serialized inline with the page, so a JSON line reads
/// `{"url": "...", "text": "..."}` or `{"url": "...", "markup": "<html>..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageBody {
    /// Text already extracted by the crawler's extractor.
    Text(String),
    /// Raw HTML; the engine falls back to its own visible-text extraction.
    Markup(String),
}

/// One page submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInput {
    /// Canonical URL. Used as the document id.
    pub url: String,
    #[serde(flatten)]
    pub body: PageBody,
    /// Hash computed by the extractor, kept for diagnostics only. The engine
    /// always hashes the normalized text itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl PageInput {
    pub fn text(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: PageBody::Text(text.into()),
            content_hash: None,
        }
    }

    pub fn markup(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: PageBody::Markup(html.into()),
            content_hash: None,
        }
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

/// Similarity record of one admitted page. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Versioned SHA-256 of the normalized text.
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor_hash: Option<String>,
    pub token_count: usize,
    /// Distinct shingles behind the signature.
    pub shingle_count: usize,
    pub signature: Vec<u64>,
    /// One `(band, hash)` key per LSH band, in band order.
    pub bucket_keys: Vec<BucketKey>,
    pub features: TextFeatures,
    /// More LSH candidates existed than the incremental budget allowed.
    pub comparisons_truncated: bool,
    /// Admitted without any incremental scoring (queue overflow).
    pub comparisons_skipped: bool,
}

impl Comparable for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn content_hash(&self) -> &str {
        &self.content_hash
    }

    fn signature(&self) -> &[u64] {
        &self.signature
    }

    fn features(&self) -> &TextFeatures {
        &self.features
    }
}

/// Result of running a page through the per-document stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Admitted(Box<Document>),
    Excluded(ExclusionReason),
}

/// Runs the stateless per-document stages: normalize, gate, shingle,
/// sign and band.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    normalize: NormalizeConfig,
    perceptual: PerceptualConfig,
    lsh: LshConfig,
    matcher: Matcher,
    min_token_count: usize,
}

impl DocumentBuilder {
    pub fn new(cfg: &EngineConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        Ok(Self {
            normalize: cfg.normalize.clone(),
            perceptual: cfg.perceptual_config(),
            lsh: cfg.lsh_config(),
            matcher: Matcher::new(cfg.similarity_config())?,
            min_token_count: cfg.min_token_count,
        })
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn lsh_config(&self) -> &LshConfig {
        &self.lsh
    }

    /// Normalize a page body.
    ///
    /// An empty result is an extraction failure, not an engine error.
    pub fn normalize(&self, body: &PageBody) -> Result<Result<NormalizedText, ExclusionReason>, EngineError> {
        let normalized = match body {
            PageBody::Text(text) => normalize(text, &self.normalize),
            PageBody::Markup(html) => normalize_markup(html, &self.normalize),
        };
        match normalized {
            Ok(text) => Ok(Ok(text)),
            Err(NormalizeError::EmptyInput) => Ok(Err(ExclusionReason::ExtractionFailure {
                message: "no text content after normalization".to_string(),
            })),
            Err(err) => Err(err.into()),
        }
    }

    /// Build the document for `page`, or the reason it is excluded.
    pub fn build(&self, page: &PageInput) -> Result<Admission, EngineError> {
        let start = Instant::now();
        let normalized = match self.normalize(&page.body)? {
            Ok(text) => text,
            Err(reason) => return Ok(Admission::Excluded(reason)),
        };

        let token_count = normalized.token_count();
        if token_count < self.min_token_count {
            return Ok(Admission::Excluded(ExclusionReason::InsufficientContent {
                token_count,
                min_token_count: self.min_token_count,
            }));
        }

        let signature = signature_for_tokens(&normalized.tokens, &self.perceptual)?;
        let keys = bucket_keys(&signature.minhash, &self.lsh)?;
        let features = self.matcher.features_for(&normalized.tokens);

        if let Some(extractor) = page.content_hash.as_deref() {
            if extractor != normalized.content_hash {
                debug!(
                    doc_id = %page.url,
                    extractor_hash = %extractor,
                    content_hash = %normalized.content_hash,
                    "extractor_hash_differs"
                );
            }
        }
        debug!(
            doc_id = %page.url,
            token_count,
            shingle_count = signature.shingle_count,
            elapsed_micros = start.elapsed().as_micros(),
            "document_built"
        );

        Ok(Admission::Admitted(Box::new(Document {
            id: page.url.clone(),
            content_hash: normalized.content_hash,
            extractor_hash: page.content_hash.clone(),
            token_count,
            shingle_count: signature.shingle_count,
            signature: signature.minhash,
            bucket_keys: keys,
            features,
            comparisons_truncated: false,
            comparisons_skipped: false,
        })))
    }
}
