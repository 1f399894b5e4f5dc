//! Post-crawl reconciliation.
//!
//! Rebuilds the LSH index over every admitted document, collects each
//! candidate pair exactly once (plus every content-hash pair) and scores the
//! whole set without the incremental comparison budget. Scoring runs on
//! Rayon over disjoint pairs; the index is built single-threaded first and
//! only read afterwards.

use std::collections::BTreeSet;
use std::time::Instant;

use hashbrown::HashMap;
use index::{LshConfig, LshIndex};
use matcher::{MatchError, Matcher, SimilarityPair};
use rayon::prelude::*;
use tracing::{Level, info};

use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::EngineError;
use crate::pairs::PairStore;

/// Outcome of a full reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Final pairs at or above the recording threshold.
    pub pairs: PairStore,
    /// Distinct pairs that were scored.
    pub scored_pairs: usize,
}

/// Score every candidate pair of `docs` under `cfg`.
///
/// Pure and deterministic: the same documents and config always give the
/// same pairs, regardless of thread count.
pub fn reconcile_documents(
    docs: &[Document],
    cfg: &EngineConfig,
) -> Result<Reconciliation, EngineError> {
    cfg.validate()?;
    let matcher = Matcher::new(cfg.similarity_config())?;
    let lsh = cfg.lsh_config();

    match cfg.reconcile_threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("sitedup-reconcile-{i}"))
                .build()
                .map_err(|err| EngineError::ThreadPool(err.to_string()))?;
            pool.install(|| reconcile_with(docs, lsh, &matcher))
        }
        None => reconcile_with(docs, lsh, &matcher),
    }
}

fn reconcile_with(
    docs: &[Document],
    lsh: LshConfig,
    matcher: &Matcher,
) -> Result<Reconciliation, EngineError> {
    let start = Instant::now();
    let span = tracing::span!(Level::INFO, "reconcile.reconcile_documents", docs = docs.len());
    let _guard = span.enter();

    let work = candidate_pairs(docs, lsh)?;
    let scored = work
        .par_iter()
        .map(|&(i, j)| matcher.compare(&docs[i], &docs[j]))
        .collect::<Result<Vec<Option<SimilarityPair>>, MatchError>>()?;
    let pairs = PairStore::from_pairs(scored.into_iter().flatten());

    info!(
        scored_pairs = work.len(),
        recorded_pairs = pairs.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "reconcile_success"
    );
    Ok(Reconciliation {
        pairs,
        scored_pairs: work.len(),
    })
}

/// Every LSH candidate pair and every content-hash pair, as ordered slot
/// indices into `docs`.
fn candidate_pairs(docs: &[Document], lsh: LshConfig) -> Result<Vec<(usize, usize)>, EngineError> {
    let mut index = LshIndex::new(lsh)?;
    let mut keys = Vec::with_capacity(docs.len());
    for doc in docs {
        keys.push(index.insert_signature(&doc.id, &doc.signature)?);
    }

    let slots: HashMap<&str, usize> = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| (doc.id.as_str(), i))
        .collect();

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (i, doc) in docs.iter().enumerate() {
        for candidate in index.candidates(&doc.id, &keys[i]) {
            if let Some(&j) = slots.get(candidate.id.as_str()) {
                if i < j {
                    pairs.insert((i, j));
                }
            }
        }
    }

    let mut by_hash: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, doc) in docs.iter().enumerate() {
        by_hash.entry(doc.content_hash.as_str()).or_default().push(i);
    }
    for group in by_hash.values() {
        for (n, &i) in group.iter().enumerate() {
            for &j in &group[n + 1..] {
                pairs.insert((i.min(j), i.max(j)));
            }
        }
    }

    Ok(pairs.into_iter().collect())
}
