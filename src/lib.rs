//! Site-wide duplicate and near-duplicate page detection.
//!
//! `sitedup` decides, across the crawled pages of one site, which pages are
//! exact duplicates, which are near-duplicates, how confident that call is
//! and which other pages they match. It never compares all pairs: each page
//! is shingled, compressed into a MinHash signature and banded into LSH
//! buckets, and only pages that collide in a bucket are scored.
//!
//! Stages live in their own crates:
//!
//! - `canonical` normalizes text and hashes it for exact matching
//! - `perceptual` builds shingle sets and MinHash signatures
//! - `index` bands signatures into LSH buckets and finds candidates
//! - `matcher` scores candidate pairs and classifies them
//!
//! This crate ties them into a [`DuplicateSession`] with an incremental pass
//! (bounded comparisons per page, results available during the crawl) and a
//! reconciliation pass (exhaustive over candidates, run after the crawl).
//! [`SimilarityPipeline`] puts a bounded, non-blocking queue in front of the
//! session for concurrent crawl workers.
//!
//! ```
//! use sitedup::{DuplicateSession, DuplicateStatus, EngineConfig, PageInput};
//!
//! let article = (0..200).map(|i| format!("term{i}")).collect::<Vec<_>>().join(" ");
//! let mut session = DuplicateSession::new(EngineConfig::default()).unwrap();
//! session.process(&PageInput::text("https://example.com/a", article.clone())).unwrap();
//! session.process(&PageInput::text("https://example.com/b", article)).unwrap();
//!
//! let report = session.finish();
//! let record = report.record("https://example.com/b").unwrap();
//! assert_eq!(record.status, DuplicateStatus::Exact);
//! assert_eq!(record.duplicate_of, vec!["https://example.com/a"]);
//! ```

mod cancel;
mod config;
mod document;
mod error;
mod metrics;
mod pairs;
mod pipeline;
mod reconcile;
mod record;
mod session;

pub use crate::cancel::{CancelHandle, CancelSignal, cancellation};
pub use crate::config::{ConfigLoadError, EngineConfig};
pub use crate::document::{Admission, Document, DocumentBuilder, PageBody, PageInput};
pub use crate::error::{EngineError, ExclusionReason};
pub use crate::metrics::{CountingMetrics, MetricsSnapshot, SessionMetrics};
pub use crate::pairs::PairStore;
pub use crate::pipeline::{PageSender, PipelineOutcome, SimilarityPipeline, Submission};
pub use crate::reconcile::{Reconciliation, reconcile_documents};
pub use crate::record::{
    DuplicateCluster, DuplicateRecord, DuplicateReport, ExcludedPage, ReportStats, SimilarPage,
    duplicate_clusters,
};
pub use crate::session::{BatchProgress, DuplicateSession, ProcessOutcome, ProcessSummary};

pub use canonical::NormalizeConfig;
pub use matcher::{Classification, DuplicateStatus, SimilarityPair, SimilarityScores};
