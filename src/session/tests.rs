use super::*;
use crate::cancel::cancellation;
use crate::metrics::CountingMetrics;
use matcher::DuplicateStatus;

fn words(prefix: &str, range: std::ops::Range<usize>) -> String {
    range.map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().join(" ")
}

fn session() -> DuplicateSession {
    DuplicateSession::new(EngineConfig::default()).unwrap()
}

fn indexed(outcome: ProcessOutcome) -> ProcessSummary {
    match outcome {
        ProcessOutcome::Indexed(summary) => summary,
        ProcessOutcome::Excluded { reason } => panic!("unexpected exclusion: {reason}"),
    }
}

#[test]
fn identical_pages_are_exact_duplicates() {
    let mut s = session();
    let text = words("article", 0..120);
    s.process(&PageInput::text("https://site/a", text.clone())).unwrap();
    let summary = indexed(s.process(&PageInput::text("https://site/b", text)).unwrap());
    assert_eq!(summary.exact_matches, 1);
    assert_eq!(summary.candidates, 0);

    let rec = s.record("https://site/b").unwrap();
    assert!(rec.is_exact_duplicate);
    assert_eq!(rec.duplicate_of, vec!["https://site/a"]);
    assert_eq!(rec.status, DuplicateStatus::Exact);
    assert_eq!(rec.similar_pages[0].score, 100.0);
    assert!(rec.provisional);
}

#[test]
fn formatting_differences_still_match_exactly() {
    let mut s = session();
    s.process(&PageInput::text(
        "a",
        "Shipping Policy: customer orders ship within THREE business days, fully tracked, \
         insured, packaged carefully, delivered nationwide.",
    ))
    .unwrap();
    s.process(&PageInput::markup(
        "b",
        "<body><p>shipping policy customer orders</p><p>ship within three business days \
         &nbsp; fully tracked insured</p><p>packaged carefully -- delivered nationwide</p></body>",
    ))
    .unwrap();
    assert_eq!(s.record("a").unwrap().status, DuplicateStatus::Exact);
}

#[test]
fn near_duplicate_is_scored_incrementally() {
    let mut s = session();
    let article = words("article", 0..300);
    s.process(&PageInput::text("a", format!("{article} {}", words("promoa", 0..10))))
        .unwrap();
    let summary = indexed(
        s.process(&PageInput::text("b", format!("{article} {}", words("promob", 0..10))))
            .unwrap(),
    );
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.compared, 1);
    assert_eq!(summary.recorded, 1);
    assert_eq!(s.record("a").unwrap().status, DuplicateStatus::High);
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut s = session();
    let page = PageInput::text("a", words("body", 0..30));
    s.process(&page).unwrap();
    let err = s.process(&page).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateDocument(id) if id == "a"));
    assert_eq!(s.len(), 1);
}

#[test]
fn short_pages_never_match_anything() {
    let mut s = session();
    let tiny = words("tiny", 0..5);
    let out = s.process(&PageInput::text("a", tiny.clone())).unwrap();
    assert!(matches!(out, ProcessOutcome::Excluded { .. }));
    s.process(&PageInput::text("b", tiny)).unwrap();

    assert!(s.is_empty());
    assert!(s.record("a").is_none());
    let report = s.finish();
    assert_eq!(report.excluded.len(), 2);
    assert!(report.records.is_empty());
    assert!(report.clusters.is_empty());
}

#[test]
fn excluded_ids_are_still_taken() {
    let mut s = session();
    s.process(&PageInput::text("a", "")).unwrap();
    let err = s.process(&PageInput::text("a", words("real", 0..40))).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateDocument(_)));
}

#[test]
fn comparison_budget_truncates() {
    let cfg = EngineConfig::default().with_max_similarity_comparisons(3);
    let mut s = DuplicateSession::new(cfg).unwrap();
    let article = words("shared", 0..200);
    for i in 0..6 {
        s.process(&PageInput::text(format!("p{i}"), format!("{article} uniq{i}x uniq{i}y")))
            .unwrap();
    }
    let last = s.document("p5").unwrap();
    assert!(last.comparisons_truncated);
    assert!(!s.document("p0").unwrap().comparisons_truncated);
    assert!(s.pairs().len() < 15);

    // Reconciliation scores what the budget skipped.
    let report = s.reconcile().unwrap();
    assert_eq!(s.pairs().len(), 15);
    assert!(report.stats.drift_count > 0);
    assert!(report.record("p5").unwrap().comparisons_truncated);
}

#[test]
fn unscored_admission_keeps_exact_matches_only() {
    let mut s = session();
    let article = words("story", 0..200);
    s.process(&PageInput::text("a", article.clone())).unwrap();
    s.process(&PageInput::text("b", format!("{article} extra1 extra2"))).unwrap();
    let summary = indexed(s.admit_unscored(&PageInput::text("c", article)).unwrap());
    assert!(summary.skipped);
    assert_eq!(summary.exact_matches, 1);
    assert!(s.pairs().get("b", "c").is_none());

    let report = s.reconcile().unwrap();
    assert!(report.record("c").unwrap().comparisons_skipped);
    assert!(s.pairs().get("b", "c").is_some());
}

#[test]
fn reconcile_is_idempotent() {
    let mut s = session();
    let base = words("guide", 0..150);
    s.process(&PageInput::text("a", base.clone())).unwrap();
    s.process(&PageInput::text("b", format!("{base} {}", words("tail", 0..30)))).unwrap();
    s.process(&PageInput::text("c", words("other", 0..150))).unwrap();

    let first = s.reconcile().unwrap();
    let second = s.reconcile().unwrap();
    assert_eq!(first, second);
    assert!(!first.provisional);
    assert!(first.records.iter().all(|r| !r.provisional));
}

#[test]
fn new_pages_make_the_report_provisional_again() {
    let mut s = session();
    s.process(&PageInput::text("a", words("page", 0..50))).unwrap();
    s.reconcile().unwrap();
    assert!(s.is_reconciled());
    s.process(&PageInput::text("b", words("page", 0..50))).unwrap();
    assert!(!s.is_reconciled());
    assert!(s.provisional_report().provisional);
}

#[test]
fn fallback_report_is_flagged() {
    let mut s = session();
    s.process(&PageInput::text("a", words("page", 0..50))).unwrap();
    let err = EngineError::ThreadPool("no threads".into());
    let report = s.fallback_report(&err);
    assert!(report.provisional);
    assert!(report.records[0].provisional);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("no threads"));
}

#[test]
fn process_all_stops_on_cancel() {
    let mut s = session();
    let (handle, signal) = cancellation();
    let pages = (0..20).map(|i| {
        if i == 5 {
            handle.cancel();
        }
        PageInput::text(format!("p{i}"), words(&format!("w{i}x"), 0..20))
    });
    let progress = s.process_all(pages, &signal);
    assert!(progress.cancelled);
    assert_eq!(progress.admitted, 5);
    assert_eq!(s.len(), 5);
}

#[test]
fn metrics_are_per_session() {
    let metrics = Arc::new(CountingMetrics::new());
    let mut s = session().with_metrics(metrics.clone());
    let mut other = session();
    s.process(&PageInput::text("a", words("alpha", 0..30))).unwrap();
    s.process(&PageInput::text("b", "")).unwrap();
    other.process(&PageInput::text("c", words("alpha", 0..30))).unwrap();
    s.reconcile().unwrap();

    let snap = metrics.snapshot();
    assert_eq!(snap.processed, 1);
    assert_eq!(snap.excluded, 1);
    assert_eq!(snap.reconciliations, 1);
}

#[test]
fn unscored_admissions_are_not_counted_as_processed() {
    let metrics = Arc::new(CountingMetrics::new());
    let mut s = session().with_metrics(metrics.clone());
    let article = words("article", 0..80);
    s.process(&PageInput::text("a", article.clone())).unwrap();
    s.admit_unscored(&PageInput::text("b", format!("{article} extra1")))
        .unwrap();
    s.admit_unscored(&PageInput::text("c", "tiny")).unwrap();

    let snap = metrics.snapshot();
    assert_eq!(snap.processed, 1);
    assert_eq!(snap.admitted_unscored, 1);
    assert_eq!(snap.excluded, 1);
}

#[test]
fn prebuilt_documents_are_admitted_unscored() {
    let mut s = session();
    let article = words("article", 0..80);
    s.process(&PageInput::text("a", article.clone())).unwrap();

    let builder = s.builder();
    let built = builder.build(&PageInput::text("b", article.clone()));
    let summary = indexed(s.admit_built("b", built).unwrap());
    assert!(summary.skipped);
    assert_eq!(summary.exact_matches, 1);

    let again = builder.build(&PageInput::text("b", article));
    assert!(matches!(
        s.admit_built("b", again),
        Err(EngineError::DuplicateDocument(_))
    ));
    assert_eq!(s.len(), 2);
}
