use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::{IndexError, LshConfig};

/// One LSH bucket: a band index and the hash of that band's signature rows.
///
/// Equal hashes in different bands are different buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub band: u16,
    pub hash: u64,
}

/// Derive the `num_bands` bucket keys of a signature, in band order.
///
/// Band hashes are seeded xxh3 over the little-endian row values, so keys
/// are stable across processes and runs.
pub fn bucket_keys(signature: &[u64], cfg: &LshConfig) -> Result<Vec<BucketKey>, IndexError> {
    cfg.validate()?;
    let expected = cfg.num_bands * cfg.rows_per_band;
    if signature.len() != expected {
        return Err(IndexError::SignatureLength {
            expected,
            got: signature.len(),
        });
    }

    let mut keys = Vec::with_capacity(cfg.num_bands);
    let mut buf = Vec::with_capacity(cfg.rows_per_band * 8);
    for (band, rows) in signature.chunks_exact(cfg.rows_per_band).enumerate() {
        buf.clear();
        for v in rows {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        keys.push(BucketKey {
            band: band as u16,
            hash: xxh3_64_with_seed(&buf, cfg.seed ^ band as u64),
        });
    }
    Ok(keys)
}
