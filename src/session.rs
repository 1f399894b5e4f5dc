//! The incremental duplicate-detection session.
//!
//! A [`DuplicateSession`] owns every structure of one crawl: documents, the
//! LSH index, the content-hash map and the recorded pairs. Pages are
//! processed one at a time with a bounded candidate budget, so provisional
//! records are available while the crawl runs; [`DuplicateSession::reconcile`]
//! later replaces them with an exhaustive pass.

use std::sync::Arc;
use std::time::Instant;

use hashbrown::{HashMap, HashSet};
use index::LshIndex;
use matcher::{Classification, SimilarityPair, SimilarityScores};
use tracing::{Level, debug, info, warn};

use crate::cancel::CancelSignal;
use crate::config::EngineConfig;
use crate::document::{Admission, Document, DocumentBuilder, PageInput};
use crate::error::{EngineError, ExclusionReason};
use crate::metrics::SessionMetrics;
use crate::pairs::PairStore;
use crate::reconcile::reconcile_documents;
use crate::record::{DuplicateRecord, DuplicateReport, ExcludedPage};

/// What happened to one submitted page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Indexed(ProcessSummary),
    Excluded { reason: ExclusionReason },
}

/// Work done for an admitted page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub id: String,
    /// Earlier pages with the same content hash.
    pub exact_matches: usize,
    /// LSH candidates other than exact matches.
    pub candidates: usize,
    /// Candidates actually scored.
    pub compared: usize,
    /// Pairs recorded, exact matches included.
    pub recorded: usize,
    pub truncated: bool,
    pub skipped: bool,
}

/// Totals of a [`DuplicateSession::process_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub admitted: usize,
    pub excluded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Duplicate-detection state for one crawl session.
pub struct DuplicateSession {
    cfg: EngineConfig,
    builder: Arc<DocumentBuilder>,
    index: LshIndex,
    docs: Vec<Document>,
    slots: HashMap<String, usize>,
    by_hash: HashMap<String, Vec<usize>>,
    excluded: Vec<ExcludedPage>,
    excluded_ids: HashSet<String>,
    pairs: PairStore,
    reconciled: bool,
    drift_count: usize,
    metrics: Option<Arc<dyn SessionMetrics>>,
}

impl std::fmt::Debug for DuplicateSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateSession")
            .field("documents", &self.docs.len())
            .field("excluded", &self.excluded.len())
            .field("pairs", &self.pairs.len())
            .field("reconciled", &self.reconciled)
            .finish_non_exhaustive()
    }
}

impl DuplicateSession {
    pub fn new(cfg: EngineConfig) -> Result<Self, EngineError> {
        let builder = Arc::new(DocumentBuilder::new(&cfg)?);
        let index = LshIndex::new(builder.lsh_config().clone())?;
        Ok(Self {
            cfg,
            builder,
            index,
            docs: Vec::new(),
            slots: HashMap::new(),
            by_hash: HashMap::new(),
            excluded: Vec::new(),
            excluded_ids: HashSet::new(),
            pairs: PairStore::new(),
            reconciled: false,
            drift_count: 0,
            metrics: None,
        })
    }

    /// Install a metrics recorder for this session only.
    pub fn with_metrics(mut self, recorder: Arc<dyn SessionMetrics>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub(crate) fn metrics(&self) -> Option<Arc<dyn SessionMetrics>> {
        self.metrics.clone()
    }

    /// Number of admitted documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Admitted documents in admission order.
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.slots.get(id).map(|&slot| &self.docs[slot])
    }

    pub fn excluded(&self) -> &[ExcludedPage] {
        &self.excluded
    }

    pub fn pairs(&self) -> &PairStore {
        &self.pairs
    }

    /// Whether the current pairs come from a reconciliation with no pages
    /// admitted since.
    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    /// Run one page through the incremental pass.
    pub fn process(&mut self, page: &PageInput) -> Result<ProcessOutcome, EngineError> {
        self.admit(&page.url, true, |builder| builder.build(page))
    }

    /// Admit a page without incremental scoring.
    ///
    /// Used for pages that overflowed the handoff queue. Content-hash matches
    /// are still recorded; similarity pairs wait for reconciliation.
    pub fn admit_unscored(&mut self, page: &PageInput) -> Result<ProcessOutcome, EngineError> {
        self.admit(&page.url, false, |builder| builder.build(page))
    }

    /// Admit, unscored, a page already built with this session's builder.
    pub(crate) fn admit_built(
        &mut self,
        id: &str,
        built: Result<Admission, EngineError>,
    ) -> Result<ProcessOutcome, EngineError> {
        self.admit(id, false, |_| built)
    }

    pub(crate) fn builder(&self) -> Arc<DocumentBuilder> {
        Arc::clone(&self.builder)
    }

    /// Process pages in order until exhausted or `cancel` fires.
    ///
    /// Cancellation is checked between documents; everything processed
    /// before it stays valid. Per-page failures are logged and counted.
    pub fn process_all<I>(&mut self, pages: I, cancel: &CancelSignal) -> BatchProgress
    where
        I: IntoIterator<Item = PageInput>,
    {
        let mut progress = BatchProgress::default();
        for page in pages {
            if cancel.is_cancelled() {
                progress.cancelled = true;
                info!(admitted = progress.admitted, "similarity_batch_cancelled");
                break;
            }
            match self.process(&page) {
                Ok(ProcessOutcome::Indexed(_)) => progress.admitted += 1,
                Ok(ProcessOutcome::Excluded { .. }) => progress.excluded += 1,
                Err(_) => progress.failed += 1,
            }
        }
        progress
    }

    fn admit<F>(&mut self, id: &str, score: bool, build: F) -> Result<ProcessOutcome, EngineError>
    where
        F: FnOnce(&DocumentBuilder) -> Result<Admission, EngineError>,
    {
        let start = Instant::now();
        let span = tracing::span!(Level::DEBUG, "session.process", doc_id = %id, score);
        let _guard = span.enter();

        match self.admit_inner(id, score, build) {
            Ok(outcome) => {
                let elapsed_micros = start.elapsed().as_micros();
                match &outcome {
                    ProcessOutcome::Indexed(summary) => {
                        info!(
                            doc_id = %summary.id,
                            exact_matches = summary.exact_matches,
                            candidates = summary.candidates,
                            compared = summary.compared,
                            recorded = summary.recorded,
                            truncated = summary.truncated,
                            skipped = summary.skipped,
                            elapsed_micros,
                            "similarity_process_success"
                        );
                        if let Some(metrics) = &self.metrics {
                            if summary.skipped {
                                metrics.record_admitted_unscored(start.elapsed());
                            } else {
                                metrics.record_process(start.elapsed(), summary.candidates, summary.compared);
                            }
                        }
                    }
                    ProcessOutcome::Excluded { reason } => {
                        info!(doc_id = %id, reason = %reason, elapsed_micros, "similarity_page_excluded");
                        if let Some(metrics) = &self.metrics {
                            metrics.record_excluded(reason);
                        }
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                let elapsed_micros = start.elapsed().as_micros();
                warn!(doc_id = %id, error = %err, elapsed_micros, "similarity_process_failure");
                Err(err)
            }
        }
    }

    fn admit_inner<F>(&mut self, id: &str, score: bool, build: F) -> Result<ProcessOutcome, EngineError>
    where
        F: FnOnce(&DocumentBuilder) -> Result<Admission, EngineError>,
    {
        if self.slots.contains_key(id) || self.excluded_ids.contains(id) {
            return Err(EngineError::DuplicateDocument(id.to_string()));
        }

        let mut doc = match build(self.builder.as_ref())? {
            Admission::Admitted(doc) => *doc,
            Admission::Excluded(reason) => {
                self.excluded_ids.insert(id.to_string());
                self.excluded.push(ExcludedPage {
                    id: id.to_string(),
                    reason: reason.clone(),
                });
                return Ok(ProcessOutcome::Excluded { reason });
            }
        };

        let mut found = Vec::new();
        let exact_slots = self.by_hash.get(&doc.content_hash).cloned().unwrap_or_default();
        for &slot in &exact_slots {
            found.push(SimilarityPair::new(
                &doc.id,
                &self.docs[slot].id,
                SimilarityScores::exact(),
                Classification::Exact,
            ));
        }

        let mut summary = ProcessSummary {
            id: doc.id.clone(),
            exact_matches: exact_slots.len(),
            ..ProcessSummary::default()
        };

        if score {
            let candidates: Vec<usize> = self
                .index
                .candidates(&doc.id, &doc.bucket_keys)
                .into_iter()
                .filter_map(|c| self.slots.get(&c.id).copied())
                .filter(|&slot| self.docs[slot].content_hash != doc.content_hash)
                .collect();
            let budget = self.cfg.max_similarity_comparisons;
            summary.candidates = candidates.len();
            summary.truncated = candidates.len() > budget;
            doc.comparisons_truncated = summary.truncated;

            for &slot in candidates.iter().take(budget) {
                summary.compared += 1;
                if let Some(pair) = self.builder.matcher().compare(&doc, &self.docs[slot])? {
                    found.push(pair);
                }
            }
            if summary.truncated {
                debug!(
                    doc_id = %doc.id,
                    candidates = summary.candidates,
                    budget,
                    "similarity_comparisons_truncated"
                );
            }
        } else {
            doc.comparisons_skipped = true;
            summary.skipped = true;
        }

        self.index.insert(&doc.id, &doc.bucket_keys)?;
        summary.recorded = found.len();
        for pair in found {
            self.pairs.insert(pair);
        }

        let slot = self.docs.len();
        self.slots.insert(doc.id.clone(), slot);
        self.by_hash.entry(doc.content_hash.clone()).or_default().push(slot);
        self.docs.push(doc);
        self.reconciled = false;

        Ok(ProcessOutcome::Indexed(summary))
    }

    /// Current record of one admitted page.
    pub fn record(&self, id: &str) -> Option<DuplicateRecord> {
        self.document(id)
            .map(|doc| DuplicateRecord::build(doc, &self.pairs, !self.reconciled))
    }

    /// Snapshot of the current state without reconciling.
    pub fn provisional_report(&self) -> DuplicateReport {
        DuplicateReport::build(
            &self.docs,
            &self.excluded,
            &self.pairs,
            !self.reconciled,
            self.drift_count,
        )
    }

    /// Re-score every candidate pair and replace the provisional pairs.
    ///
    /// Idempotent: a second call without new pages yields the same report.
    pub fn reconcile(&mut self) -> Result<DuplicateReport, EngineError> {
        let start = Instant::now();
        let result = match reconcile_documents(&self.docs, &self.cfg) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, documents = self.docs.len(), "similarity_reconcile_failure");
                return Err(err);
            }
        };

        let drift = self.measure_drift(&result.pairs);
        self.drift_count += drift;
        self.pairs = result.pairs;
        self.reconciled = true;

        info!(
            documents = self.docs.len(),
            scored_pairs = result.scored_pairs,
            recorded_pairs = self.pairs.len(),
            drift,
            elapsed_micros = start.elapsed().as_micros(),
            "similarity_reconcile_success"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_reconcile(start.elapsed(), self.pairs.len(), drift);
        }
        Ok(self.provisional_report())
    }

    /// Reconcile and return the final report.
    ///
    /// If reconciliation fails the provisional report is returned instead,
    /// flagged `provisional` and carrying a warning.
    pub fn finish(mut self) -> DuplicateReport {
        match self.reconcile() {
            Ok(report) => report,
            Err(err) => self.fallback_report(&err),
        }
    }

    pub(crate) fn fallback_report(&self, err: &EngineError) -> DuplicateReport {
        warn!(error = %err, "similarity_reconcile_fallback");
        let mut report = self.provisional_report();
        report.provisional = true;
        for record in &mut report.records {
            record.provisional = true;
        }
        report
            .warnings
            .push(format!("reconciliation failed, reporting provisional scores: {err}"));
        report
    }

    /// Count pairs whose score moved by more than `drift_epsilon`.
    ///
    /// A pair missing on one side scores 0 there.
    fn measure_drift(&self, reconciled: &PairStore) -> usize {
        let eps = self.cfg.drift_epsilon;
        let mut drift = 0;
        let mut check = |a: &str, b: &str, provisional: f64, final_score: f64| {
            if (provisional - final_score).abs() > eps {
                debug!(
                    doc_a = %a,
                    doc_b = %b,
                    provisional,
                    final_score,
                    "reconciliation_drift"
                );
                drift += 1;
            }
        };
        for pair in reconciled.iter() {
            let provisional = self
                .pairs
                .get(&pair.doc_a, &pair.doc_b)
                .map_or(0.0, |p| p.scores.final_score);
            check(&pair.doc_a, &pair.doc_b, provisional, pair.scores.final_score);
        }
        for pair in self.pairs.iter() {
            if reconciled.get(&pair.doc_a, &pair.doc_b).is_none() {
                check(&pair.doc_a, &pair.doc_b, pair.scores.final_score, 0.0);
            }
        }
        drift
    }
}

#[cfg(test)]
mod tests;
