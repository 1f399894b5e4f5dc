use hashbrown::HashMap;
use tracing::trace;

use crate::bucket::{bucket_keys, BucketKey};
use crate::{IndexError, LshConfig};

/// A document returned by a candidate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    /// Number of buckets the candidate shares with the queried document.
    pub shared_buckets: usize,
}

/// MinHash banding index mapping bucket keys to the documents in them.
///
/// The index is owned by one session. Mutation takes `&mut self`; readers
/// that only look up candidates can share `&LshIndex` across threads.
#[derive(Debug, Clone)]
pub struct LshIndex {
    cfg: LshConfig,
    buckets: HashMap<BucketKey, Vec<u32>>,
    slots: HashMap<String, u32>,
    ids: Vec<String>,
}

impl LshIndex {
    pub fn new(cfg: LshConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            buckets: HashMap::new(),
            slots: HashMap::new(),
            ids: Vec::new(),
        })
    }

    pub fn config(&self) -> &LshConfig {
        &self.cfg
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of distinct non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Derive bucket keys for `signature` under this index's banding.
    pub fn keys_for(&self, signature: &[u64]) -> Result<Vec<BucketKey>, IndexError> {
        bucket_keys(signature, &self.cfg)
    }

    /// Place a document into its buckets.
    ///
    /// `keys` must come from [`LshIndex::keys_for`] (or [`bucket_keys`] with
    /// the same config); one key per band is required.
    pub fn insert(&mut self, id: &str, keys: &[BucketKey]) -> Result<(), IndexError> {
        if keys.len() != self.cfg.num_bands {
            return Err(IndexError::BucketCount {
                expected: self.cfg.num_bands,
                got: keys.len(),
            });
        }
        if self.slots.contains_key(id) {
            return Err(IndexError::DuplicateId(id.to_string()));
        }
        let slot = u32::try_from(self.ids.len()).map_err(|_| IndexError::Full)?;
        self.ids.push(id.to_string());
        self.slots.insert(id.to_string(), slot);
        for key in keys {
            self.buckets.entry(*key).or_default().push(slot);
        }
        trace!(doc_id = %id, slot, "lsh_insert");
        Ok(())
    }

    /// Convenience: derive keys and insert in one step, returning the keys.
    pub fn insert_signature(
        &mut self,
        id: &str,
        signature: &[u64],
    ) -> Result<Vec<BucketKey>, IndexError> {
        let keys = self.keys_for(signature)?;
        self.insert(id, &keys)?;
        Ok(keys)
    }

    /// Every other document sharing at least one bucket with `keys`.
    ///
    /// `id` itself is excluded whether or not it is indexed. Results are
    /// ranked by shared-bucket count (most first), ties by id, so that
    /// callers scoring under a budget see the likeliest matches first.
    pub fn candidates(&self, id: &str, keys: &[BucketKey]) -> Vec<Candidate> {
        let own = self.slots.get(id).copied();
        let mut hits: HashMap<u32, usize> = HashMap::new();
        for key in keys {
            if let Some(members) = self.buckets.get(key) {
                for &slot in members {
                    if Some(slot) != own {
                        *hits.entry(slot).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut out: Vec<Candidate> = hits
            .into_iter()
            .map(|(slot, shared_buckets)| Candidate {
                id: self.ids[slot as usize].clone(),
                shared_buckets,
            })
            .collect();
        out.sort_unstable_by(|a, b| {
            b.shared_buckets
                .cmp(&a.shared_buckets)
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    /// Iterate over all non-empty buckets with their member counts.
    pub fn bucket_sizes(&self) -> impl Iterator<Item = (&BucketKey, usize)> + '_ {
        self.buckets.iter().map(|(key, members)| (key, members.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index() -> LshIndex {
        LshIndex::new(LshConfig::new(4, 2)).unwrap()
    }

    fn sig(base: u64) -> Vec<u64> {
        (0..8).map(|i| base * 100 + i).collect()
    }

    #[test]
    fn identical_signatures_share_every_bucket() {
        let mut idx = small_index();
        idx.insert_signature("a", &sig(1)).unwrap();
        let keys = idx.insert_signature("b", &sig(1)).unwrap();

        let cands = idx.candidates("b", &keys);
        assert_eq!(
            cands,
            vec![Candidate {
                id: "a".into(),
                shared_buckets: 4
            }]
        );
    }

    #[test]
    fn lookup_never_returns_itself() {
        let mut idx = small_index();
        let keys = idx.insert_signature("self", &sig(3)).unwrap();
        assert!(idx.candidates("self", &keys).is_empty());
    }

    #[test]
    fn unrelated_signatures_are_not_candidates() {
        let mut idx = small_index();
        idx.insert_signature("a", &sig(1)).unwrap();
        let keys = idx.keys_for(&sig(2)).unwrap();
        assert!(idx.candidates("query", &keys).is_empty());
    }

    #[test]
    fn candidates_ranked_by_shared_buckets_then_id() {
        let mut idx = small_index();
        let query = sig(5);

        let mut one_band = sig(9);
        one_band[0..2].copy_from_slice(&query[0..2]);
        let mut three_bands = query.clone();
        three_bands[7] = 0;

        idx.insert_signature("z-three", &three_bands).unwrap();
        idx.insert_signature("b-one", &one_band).unwrap();
        idx.insert_signature("a-one", &one_band).unwrap();

        let keys = idx.keys_for(&query).unwrap();
        let ids: Vec<(String, usize)> = idx
            .candidates("query", &keys)
            .into_iter()
            .map(|c| (c.id, c.shared_buckets))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("z-three".to_string(), 3),
                ("a-one".to_string(), 1),
                ("b-one".to_string(), 1)
            ]
        );
    }

    #[test]
    fn every_document_occupies_one_bucket_per_band() {
        let mut idx = small_index();
        for i in 0..10 {
            idx.insert_signature(&format!("doc{i}"), &sig(i)).unwrap();
        }
        let memberships: usize = idx.bucket_sizes().map(|(_, n)| n).sum();
        assert_eq!(memberships, 10 * 4);
        assert_eq!(idx.len(), 10);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut idx = small_index();
        idx.insert_signature("a", &sig(1)).unwrap();
        assert!(matches!(
            idx.insert_signature("a", &sig(2)),
            Err(IndexError::DuplicateId(id)) if id == "a"
        ));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn wrong_key_count_is_rejected() {
        let mut idx = small_index();
        let keys = idx.keys_for(&sig(1)).unwrap();
        assert!(matches!(
            idx.insert("a", &keys[..2]),
            Err(IndexError::BucketCount { expected: 4, got: 2 })
        ));
    }

    #[test]
    fn repeated_signature_fills_each_bucket_twice() {
        let mut idx = small_index();
        let keys = idx.insert_signature("a", &sig(1)).unwrap();
        idx.insert_signature("b", &sig(1)).unwrap();
        assert_eq!(idx.bucket_count(), 4);
        assert!(idx.bucket_sizes().all(|(_, n)| n == 2));
        let found = idx.candidates("a", &keys);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shared_buckets, 4);
    }
}
