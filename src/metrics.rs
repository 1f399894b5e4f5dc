use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::ExclusionReason;

/// Observer for session activity.
///
/// Installed per session with
/// [`DuplicateSession::with_metrics`](crate::DuplicateSession::with_metrics).
/// Every method has a no-op default, so recorders implement only what they
/// export.
pub trait SessionMetrics: Send + Sync {
    /// A page was admitted and scored against `compared` of its `candidates`.
    fn record_process(&self, _latency: Duration, _candidates: usize, _compared: usize) {}

    /// An overflow page was admitted without incremental scoring.
    fn record_admitted_unscored(&self, _latency: Duration) {}

    fn record_excluded(&self, _reason: &ExclusionReason) {}

    /// A page missed the incremental pass because the handoff queue was full.
    fn record_overflow(&self) {}

    fn record_reconcile(&self, _latency: Duration, _pairs: usize, _drift: usize) {}
}

/// Lock-free counters, handy for logging a summary at the end of a crawl.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    pub processed: AtomicUsize,
    pub admitted_unscored: AtomicUsize,
    pub excluded: AtomicUsize,
    pub overflowed: AtomicUsize,
    pub candidates: AtomicUsize,
    pub compared: AtomicUsize,
    pub reconciliations: AtomicUsize,
    pub process_micros: AtomicU64,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            admitted_unscored: self.admitted_unscored.load(Ordering::Relaxed),
            excluded: self.excluded.load(Ordering::Relaxed),
            overflowed: self.overflowed.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            compared: self.compared.load(Ordering::Relaxed),
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            process_micros: self.process_micros.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CountingMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Pages admitted through the incremental pass.
    pub processed: usize,
    pub admitted_unscored: usize,
    pub excluded: usize,
    pub overflowed: usize,
    pub candidates: usize,
    pub compared: usize,
    pub reconciliations: usize,
    pub process_micros: u64,
}

impl SessionMetrics for CountingMetrics {
    fn record_process(&self, latency: Duration, candidates: usize, compared: usize) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.candidates.fetch_add(candidates, Ordering::Relaxed);
        self.compared.fetch_add(compared, Ordering::Relaxed);
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.process_micros.fetch_add(micros, Ordering::Relaxed);
    }

    fn record_admitted_unscored(&self, _latency: Duration) {
        self.admitted_unscored.fetch_add(1, Ordering::Relaxed);
    }

    fn record_excluded(&self, _reason: &ExclusionReason) {
        self.excluded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_overflow(&self) {
        self.overflowed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reconcile(&self, _latency: Duration, _pairs: usize, _drift: usize) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }
}
