//! k-token shingling over a normalized token stream.
//!
//! Shingles are hashed with a seeded rolling polynomial hash in O(n) and
//! returned as a set: sorted, deduplicated `u64` values.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::minhash::splitmix64;

/// Compute rolling-hash shingles for every k-token window, in order.
///
/// Returns an empty vector when `k == 0` or the stream is shorter than `k`.
pub fn make_shingles_rolling<S: AsRef<str>>(tokens: &[S], k: usize, seed: u64) -> Vec<u64> {
    let n = tokens.len();
    if k == 0 || n < k {
        return Vec::new();
    }
    let mut th: Vec<u64> = Vec::with_capacity(n);
    th.extend(
        tokens
            .iter()
            .map(|t| xxh3_64_with_seed(t.as_ref().as_bytes(), seed)),
    );

    // Polynomial base, perturbed by the seed.
    const BASE: u64 = 1_000_003;
    let base = BASE ^ splitmix64(seed);

    // base^(k-1) removes the outgoing token in O(1).
    let mut base_km1 = 1u64;
    for _ in 1..k {
        base_km1 = base_km1.wrapping_mul(base);
    }

    let mut out = Vec::with_capacity(n - k + 1);
    let mut h = 0u64;
    for &val in th.iter().take(k) {
        h = h.wrapping_mul(base).wrapping_add(val);
    }
    out.push(h);

    for (&old, &new) in th.iter().zip(th.iter().skip(k)) {
        h = h.wrapping_sub(old.wrapping_mul(base_km1));
        h = h.wrapping_mul(base).wrapping_add(new);
        out.push(h);
    }
    out
}

/// The distinct shingle hashes of a token stream.
///
/// A stream with fewer than `k` tokens (but at least one) is treated as a
/// single shingle spanning the whole sequence, so short pages still compare.
pub fn shingle_set<S: AsRef<str>>(tokens: &[S], k: usize, seed: u64) -> Vec<u64> {
    if tokens.is_empty() || k == 0 {
        return Vec::new();
    }
    let width = k.min(tokens.len());
    let mut set = make_shingles_rolling(tokens, width, seed);
    set.sort_unstable();
    set.dedup();
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 0xF00D_BAAD_F00D_BAAD;

    #[test]
    fn rolling_emits_one_hash_per_window() {
        let tokens = ["a", "b", "c", "d", "e", "f"];
        let shingles = make_shingles_rolling(&tokens, 3, SEED);
        assert_eq!(shingles.len(), 4);
    }

    #[test]
    fn rolling_matches_direct_window_hash() {
        let tokens = ["alpha", "beta", "gamma", "delta", "epsilon"];
        let rolled = make_shingles_rolling(&tokens, 2, SEED);
        for (i, window) in tokens.windows(2).enumerate() {
            let direct = make_shingles_rolling(window, 2, SEED);
            assert_eq!(direct, vec![rolled[i]]);
        }
    }

    #[test]
    fn rolling_too_short_is_empty() {
        assert!(make_shingles_rolling(&["a", "b"], 3, SEED).is_empty());
        assert!(make_shingles_rolling(&["a", "b"], 0, SEED).is_empty());
    }

    #[test]
    fn shingle_set_is_sorted_and_unique() {
        let tokens = ["x", "y", "x", "y", "x", "y", "x", "y"];
        let set = shingle_set(&tokens, 2, SEED);
        // Only "x y" and "y x" windows exist.
        assert_eq!(set.len(), 2);
        assert!(set.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn short_sequence_becomes_single_shingle() {
        let tokens = ["only", "three", "words"];
        let set = shingle_set(&tokens, 5, SEED);
        assert_eq!(set, make_shingles_rolling(&tokens, 3, SEED));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn empty_sequence_has_no_shingles() {
        let tokens: [&str; 0] = [];
        assert!(shingle_set(&tokens, 5, SEED).is_empty());
    }

    #[test]
    fn seed_changes_hashes() {
        let tokens = ["a", "b", "c", "d", "e"];
        assert_ne!(
            shingle_set(&tokens, 5, 1),
            shingle_set(&tokens, 5, 2)
        );
    }
}
