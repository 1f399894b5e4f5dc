//! Per-page duplicate records and the session report.

use std::collections::{BTreeSet, VecDeque};

use hashbrown::HashSet;
use matcher::{Classification, DuplicateStatus, document_status, score_percent};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::ExclusionReason;
use crate::pairs::PairStore;

/// Another page similar to the record's page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPage {
    pub id: String,
    /// Percentage, rounded to two decimals.
    pub score: f64,
    pub classification: Classification,
}

/// Duplicate status of one admitted page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub id: String,
    pub is_exact_duplicate: bool,
    /// Pages with the same normalized content hash.
    pub duplicate_of: Vec<String>,
    /// Every recorded pair, most similar first.
    pub similar_pages: Vec<SimilarPage>,
    pub status: DuplicateStatus,
    pub comparisons_truncated: bool,
    pub comparisons_skipped: bool,
    /// Scores come from the incremental pass and may still change.
    pub provisional: bool,
}

impl DuplicateRecord {
    pub fn build(doc: &Document, pairs: &PairStore, provisional: bool) -> Self {
        let mut similar_pages: Vec<SimilarPage> = pairs
            .pairs_for(&doc.id)
            .filter_map(|pair| {
                pair.other(&doc.id).map(|other| SimilarPage {
                    id: other.to_string(),
                    score: score_percent(pair.scores.final_score),
                    classification: pair.classification,
                })
            })
            .collect();
        similar_pages.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id.cmp(&b.id))
        });

        let duplicate_of: Vec<String> = similar_pages
            .iter()
            .filter(|p| p.classification == Classification::Exact)
            .map(|p| p.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let status = document_status(similar_pages.iter().map(|p| p.classification));

        Self {
            id: doc.id.clone(),
            is_exact_duplicate: !duplicate_of.is_empty(),
            duplicate_of,
            similar_pages,
            status,
            comparisons_truncated: doc.comparisons_truncated,
            comparisons_skipped: doc.comparisons_skipped,
            provisional,
        }
    }
}

/// A page that took no part in duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedPage {
    pub id: String,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// Connected group of pages linked by recorded pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    /// Member ids, sorted.
    pub pages: Vec<String>,
    /// Most severe classification of any pair inside the cluster.
    pub classification: Classification,
    /// Highest pair score inside the cluster, as a percentage.
    pub max_score: f64,
}

/// Group pages into clusters over the pair graph.
///
/// Clusters are ordered by their smallest member id; singletons are omitted.
pub fn duplicate_clusters(pairs: &PairStore) -> Vec<DuplicateCluster> {
    let roots: BTreeSet<&str> = pairs
        .iter()
        .flat_map(|p| [p.doc_a.as_str(), p.doc_b.as_str()])
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut clusters = Vec::new();
    for root in roots {
        if !seen.insert(root) {
            continue;
        }
        let mut members = BTreeSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            members.insert(id);
            for next in pairs.neighbors(id) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut classification = Classification::Low;
        let mut max_score = 0.0_f64;
        for &id in &members {
            for pair in pairs.pairs_for(id) {
                classification = classification.max(pair.classification);
                max_score = max_score.max(pair.scores.final_score);
            }
        }
        clusters.push(DuplicateCluster {
            pages: members.into_iter().map(str::to_string).collect(),
            classification,
            max_score: score_percent(max_score),
        });
    }
    clusters
}

/// Session-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub pages_admitted: usize,
    pub pages_excluded: usize,
    pub unique_pages: usize,
    /// Pages with at least one content-hash match.
    pub exact_duplicate_pages: usize,
    pub pairs_exact: usize,
    pub pairs_high: usize,
    pub pairs_medium: usize,
    pub pairs_low: usize,
    pub comparisons_truncated: usize,
    pub comparisons_skipped: usize,
    /// Pairs whose reconciled score moved by more than the drift epsilon.
    pub drift_count: usize,
    pub cluster_count: usize,
}

/// Everything the session knows, exported for the reporting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// One record per admitted page, in admission order.
    pub records: Vec<DuplicateRecord>,
    pub excluded: Vec<ExcludedPage>,
    pub clusters: Vec<DuplicateCluster>,
    pub stats: ReportStats,
    /// True unless the report reflects a completed reconciliation.
    pub provisional: bool,
    pub warnings: Vec<String>,
}

impl DuplicateReport {
    pub fn build(
        docs: &[Document],
        excluded: &[ExcludedPage],
        pairs: &PairStore,
        provisional: bool,
        drift_count: usize,
    ) -> Self {
        let records: Vec<DuplicateRecord> = docs
            .iter()
            .map(|doc| DuplicateRecord::build(doc, pairs, provisional))
            .collect();
        let clusters = duplicate_clusters(pairs);

        let stats = ReportStats {
            pages_admitted: records.len(),
            pages_excluded: excluded.len(),
            unique_pages: records
                .iter()
                .filter(|r| r.status == DuplicateStatus::Unique)
                .count(),
            exact_duplicate_pages: records.iter().filter(|r| r.is_exact_duplicate).count(),
            pairs_exact: pairs.count_by_class(Classification::Exact),
            pairs_high: pairs.count_by_class(Classification::High),
            pairs_medium: pairs.count_by_class(Classification::Medium),
            pairs_low: pairs.count_by_class(Classification::Low),
            comparisons_truncated: records.iter().filter(|r| r.comparisons_truncated).count(),
            comparisons_skipped: records.iter().filter(|r| r.comparisons_skipped).count(),
            drift_count,
            cluster_count: clusters.len(),
        };

        Self {
            records,
            excluded: excluded.to_vec(),
            clusters,
            stats,
            provisional,
            warnings: Vec::new(),
        }
    }

    pub fn record(&self, id: &str) -> Option<&DuplicateRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}
