use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use matcher::{Classification, PairKey, SimilarityPair};

/// Recorded pairs of a session, stored once per unordered pair with a
/// per-document adjacency for record lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairStore {
    pairs: BTreeMap<PairKey, SimilarityPair>,
    neighbors: HashMap<String, BTreeSet<String>>,
}

impl PairStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = SimilarityPair>,
    {
        let mut store = Self::new();
        for pair in pairs {
            store.insert(pair);
        }
        store
    }

    /// Insert or replace the pair for `(doc_a, doc_b)`.
    pub fn insert(&mut self, pair: SimilarityPair) {
        self.neighbors
            .entry(pair.doc_a.clone())
            .or_default()
            .insert(pair.doc_b.clone());
        self.neighbors
            .entry(pair.doc_b.clone())
            .or_default()
            .insert(pair.doc_a.clone());
        self.pairs.insert(pair.key(), pair);
    }

    pub fn get(&self, a: &str, b: &str) -> Option<&SimilarityPair> {
        self.pairs.get(&PairKey::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All pairs in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = &SimilarityPair> + '_ {
        self.pairs.values()
    }

    /// Ids paired with `id`, sorted.
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &str> + '_ {
        self.neighbors
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Pairs involving `id`.
    pub fn pairs_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a SimilarityPair> + 'a {
        self.neighbors(id).filter_map(move |other| self.get(id, other))
    }

    pub fn count_by_class(&self, class: Classification) -> usize {
        self.pairs
            .values()
            .filter(|p| p.classification == class)
            .count()
    }
}
