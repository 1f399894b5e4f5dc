//! Similarity signals for a candidate pair.
//!
//! Every function here is symmetric in its arguments.

use hashbrown::{HashMap, HashSet};
use perceptual::estimate_jaccard;

use crate::features::TextFeatures;
use crate::types::SimilarityScores;

/// Exact Jaccard similarity of two token sets. Two empty sets score 0.
pub fn token_jaccard(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let inter = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

/// Ratcliff/Obershelp ratio: `2 * M / (|a| + |b|)`.
///
/// `M` counts elements matched by recursively taking the longest common
/// contiguous block and repeating on the unmatched left and right remainders.
/// Ties between equally long blocks go to the earliest position in `a`, then
/// in `b`. Popular elements of long sequences never start or extend a block
/// (see `block_anchors`).
pub fn sequence_ratio(a: &[u64], b: &[u64]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let matched = matching_elements(a, b) + matching_elements(b, a);
    // Block matching is not symmetric under ties; average both directions.
    matched as f64 / total as f64
}

/// Sequences at least this long drop their popular elements.
const POPULAR_MIN_LEN: usize = 200;

/// Positions of each element of `b`, minus popular elements.
///
/// Once `b` has [`POPULAR_MIN_LEN`] elements, any element occurring more than
/// `len / 100 + 1` times is left out, so listing rows, navigation and table
/// cells cannot anchor a block.
fn block_anchors(b: &[u64]) -> HashMap<u64, Vec<usize>> {
    let mut positions: HashMap<u64, Vec<usize>> = HashMap::new();
    for (j, &item) in b.iter().enumerate() {
        positions.entry(item).or_default().push(j);
    }
    if b.len() >= POPULAR_MIN_LEN {
        let limit = b.len() / 100 + 1;
        positions.retain(|_, js| js.len() <= limit);
    }
    positions
}

fn matching_elements(a: &[u64], b: &[u64]) -> usize {
    let positions = block_anchors(b);

    let mut matched = 0;
    let mut stack = vec![(0, a.len(), 0, b.len())];
    let mut run = LongestRun::default();
    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = run.find(a, &positions, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            stack.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            stack.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Scratch maps reused across longest-block searches.
#[derive(Default)]
struct LongestRun {
    prev: HashMap<usize, usize>,
    next: HashMap<usize, usize>,
}

impl LongestRun {
    /// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as
    /// `(start_a, start_b, len)`.
    fn find(
        &mut self,
        a: &[u64],
        positions: &HashMap<u64, Vec<usize>>,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
        self.prev.clear();
        for (i, item) in a.iter().enumerate().take(ahi).skip(alo) {
            self.next.clear();
            if let Some(js) = positions.get(item) {
                let from = js.partition_point(|&j| j < blo);
                for &j in js[from..].iter().take_while(|&&j| j < bhi) {
                    let k = j
                        .checked_sub(1)
                        .and_then(|p| self.prev.get(&p))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    self.next.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            std::mem::swap(&mut self.prev, &mut self.next);
        }
        (best_i, best_j, best_k)
    }
}

/// Compute all three signals for a pair.
pub fn estimate(
    sig_a: &[u64],
    features_a: &TextFeatures,
    sig_b: &[u64],
    features_b: &TextFeatures,
) -> SimilarityScores {
    SimilarityScores::new(
        estimate_jaccard(sig_a, sig_b),
        token_jaccard(&features_a.token_set, &features_b.token_set),
        sequence_ratio(&features_a.sequence, &features_b.sequence),
    )
}
