//! Pipeline handoff, overflow and cancellation under concurrent submitters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use sitedup::{
    CountingMetrics, DuplicateSession, DuplicateStatus, EngineConfig, PageInput, SessionMetrics,
    SimilarityPipeline, Submission, reconcile_documents,
};

fn page(worker: usize, i: usize) -> PageInput {
    let topic = i % 5;
    let body = format!(
        "{} {}",
        (0..200).map(|w| format!("topic{topic}w{w}")).collect::<Vec<_>>().join(" "),
        (0..8).map(|w| format!("w{worker}p{i}x{w}")).collect::<Vec<_>>().join(" "),
    );
    PageInput::text(format!("https://site.test/{worker}/{i}"), body)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_submitters_lose_no_pages() {
    let session = DuplicateSession::new(EngineConfig::default()).unwrap();
    let pipeline = SimilarityPipeline::spawn(session, 4);

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let sender = pipeline.sender();
            thread::spawn(move || {
                let mut deferred = 0;
                for i in 0..25 {
                    if sender.submit(page(worker, i)).unwrap() == Submission::Deferred {
                        deferred += 1;
                    }
                }
                deferred
            })
        })
        .collect();
    let deferred: usize = workers.into_iter().map(|h| h.join().unwrap()).sum();

    let out = pipeline.finish().await.unwrap();
    assert!(!out.cancelled);
    assert_eq!(out.processed + out.overflow_admitted, 100);
    assert_eq!(out.overflow_admitted, deferred);
    assert_eq!(out.session.len(), 100);

    let skipped = out
        .session
        .documents()
        .iter()
        .filter(|d| d.comparisons_skipped)
        .count();
    assert_eq!(skipped, deferred);

    let report = out.session.finish();
    assert!(!report.provisional);
    assert_eq!(report.stats.comparisons_skipped, deferred);
    assert!(report.records.iter().all(|r| r.status == DuplicateStatus::High));
}

#[tokio::test]
async fn overflow_is_counted_once_by_session_metrics() {
    let metrics = Arc::new(CountingMetrics::new());
    let session = DuplicateSession::new(EngineConfig::default())
        .unwrap()
        .with_metrics(metrics.clone());
    let pipeline = SimilarityPipeline::spawn(session, 1);
    let sender = pipeline.sender();
    let deferred = (0..12)
        .filter(|&i| sender.submit(page(0, i)).unwrap() == Submission::Deferred)
        .count();
    drop(sender);
    let out = pipeline.finish().await.unwrap();

    assert_eq!(out.processed + out.overflow_admitted, 12);
    assert_eq!(out.overflow_admitted, deferred);
    let snap = metrics.snapshot();
    assert_eq!(snap.overflowed, deferred);
    assert_eq!(snap.processed, out.processed);
    assert_eq!(snap.admitted_unscored, out.overflow_admitted);
}

/// Holds every scored page until the runtime thread answers.
struct Handshake {
    rx: Mutex<mpsc::Receiver<()>>,
    answered: AtomicBool,
}

impl SessionMetrics for Handshake {
    fn record_process(&self, _latency: Duration, _candidates: usize, _compared: usize) {
        let rx = self.rx.lock().unwrap();
        if rx.recv_timeout(Duration::from_secs(5)).is_ok() {
            self.answered.store(true, Ordering::SeqCst);
        }
    }
}

#[tokio::test(flavor = "current_thread")]
async fn scoring_leaves_the_runtime_thread_free() {
    let (tx, rx) = mpsc::channel();
    let handshake = Arc::new(Handshake {
        rx: Mutex::new(rx),
        answered: AtomicBool::new(false),
    });
    let session = DuplicateSession::new(EngineConfig::default())
        .unwrap()
        .with_metrics(handshake.clone());
    let pipeline = SimilarityPipeline::spawn(session, 4);
    pipeline.sender().submit(page(0, 0)).unwrap();

    // Needs the only runtime thread while the consumer waits in record_process.
    let ticker = tokio::spawn(async move {
        tokio::task::yield_now().await;
        tx.send(()).unwrap();
    });
    let out = pipeline.finish().await.unwrap();
    ticker.await.unwrap();

    assert_eq!(out.processed, 1);
    assert!(handshake.answered.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancellation_keeps_processed_documents_valid() {
    let session = DuplicateSession::new(EngineConfig::default()).unwrap();
    let pipeline = SimilarityPipeline::spawn(session, 64);
    let sender = pipeline.sender();
    for i in 0..30 {
        sender.submit(page(0, i)).unwrap();
    }
    tokio::task::yield_now().await;
    pipeline.cancel();
    let out = pipeline.finish().await.unwrap();

    assert!(out.cancelled);
    assert_eq!(out.processed + out.dropped, 30);
    assert_eq!(out.session.len(), out.processed);

    let cfg = out.session.config().clone();
    let reconciled = reconcile_documents(out.session.documents(), &cfg).unwrap();
    for pair in reconciled.pairs.iter() {
        assert!(out.session.document(&pair.doc_a).is_some());
        assert!(out.session.document(&pair.doc_b).is_some());
    }
}

#[test]
fn sessions_are_independent_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            thread::spawn(move || {
                let mut s = DuplicateSession::new(EngineConfig::default()).unwrap();
                for i in 0..10 {
                    s.process(&page(worker, i)).unwrap();
                }
                s.finish()
            })
        })
        .collect();
    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for report in &reports {
        assert_eq!(report.records.len(), 10);
        assert_eq!(report.stats.cluster_count, 5);
    }
}

#[test]
fn reconciliation_thread_count_does_not_change_results() {
    let mut s = DuplicateSession::new(EngineConfig::default()).unwrap();
    for i in 0..40 {
        s.process(&page(1, i)).unwrap();
    }
    let base = s.config().clone();
    let one = reconcile_documents(s.documents(), &base.clone().with_reconcile_threads(1)).unwrap();
    let four = reconcile_documents(s.documents(), &base.with_reconcile_threads(4)).unwrap();
    assert_eq!(one, four);
}
