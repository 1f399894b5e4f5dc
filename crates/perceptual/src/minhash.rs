//! MinHash signatures over shingle sets.
//!
//! Each slot simulates one permutation with a key derived from the seed and
//! the slot index, so the whole family is reproducible from a single `u64`.

use rayon::prelude::*;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::config::PerceptualConfig;

/// Compute a MinHash signature of length `m` (parallel if `cfg.use_parallel`).
///
/// An empty shingle set yields `u64::MAX` in every slot.
pub fn minhash_signature(unique_shingles: &[u64], m: usize, cfg: &PerceptualConfig) -> Vec<u64> {
    if m == 0 {
        return Vec::new();
    }

    if unique_shingles.is_empty() {
        return vec![u64::MAX; m];
    }

    let mut result = Vec::with_capacity(m);

    if cfg.use_parallel {
        (0..m)
            .into_par_iter()
            .map(|j| compute_slot(unique_shingles, j, cfg.seed))
            .collect_into_vec(&mut result);
    } else {
        for j in 0..m {
            result.push(compute_slot(unique_shingles, j, cfg.seed));
        }
    }

    result
}

/// Fraction of positions where two signatures agree.
///
/// This is an unbiased estimate of the Jaccard similarity of the underlying
/// shingle sets. Signatures of different lengths, or empty ones, score 0.
pub fn estimate_jaccard(a: &[u64], b: &[u64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let agree = a.iter().zip(b).filter(|(x, y)| x == y).count();
    agree as f64 / a.len() as f64
}

#[inline]
pub(crate) fn compute_slot(unique_shingles: &[u64], j: usize, seed: u64) -> u64 {
    let step = (j as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let key = splitmix64(seed.wrapping_add(step));
    let mut minv = u64::MAX;
    for &val in unique_shingles {
        let h = mix_u64(val, key);
        if h < minv {
            minv = h;
        }
    }
    minv
}

/// Keyed 64-bit mix: xxh3 under `key`, then a murmur3 finalizer.
#[inline]
pub(crate) fn mix_u64(x: u64, key: u64) -> u64 {
    let mut h = xxh3_64_with_seed(&x.to_le_bytes(), key);
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
    h ^ (h >> 33)
}

#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
