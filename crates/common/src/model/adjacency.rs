//! Adjacency map representation
//!
//! `cited → {citing}`: each key is a paper and its value is the set of papers
//! citing it. Ordered containers keep iteration and serialized output
//! deterministic.

use super::PaperId;
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Edge in the cited-by graph: `citing` cites `cited`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CitationEdge {
    /// Paper being cited
    pub cited: PaperId,

    /// Paper containing the citation
    pub citing: PaperId,
}

/// Mapping from a paper to the set of papers that cite it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjacencyMap {
    entries: BTreeMap<PaperId, BTreeSet<PaperId>>,
}

impl AdjacencyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from string lists, mostly useful for tests and fixtures
    pub fn from_lists<'a, I, J>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, J)>,
        J: IntoIterator<Item = &'a str>,
    {
        entries
            .into_iter()
            .map(|(key, citing)| {
                (
                    PaperId::from(key),
                    citing.into_iter().map(PaperId::from).collect(),
                )
            })
            .collect()
    }

    /// Number of keys (nodes known to the graph)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Papers citing `id`, if `id` is a key
    pub fn get(&self, id: &str) -> Option<&BTreeSet<PaperId>> {
        self.entries.get(id)
    }

    /// Insert an entry, replacing any existing value set
    pub fn insert(&mut self, id: PaperId, citing: BTreeSet<PaperId>) -> Option<BTreeSet<PaperId>> {
        self.entries.insert(id, citing)
    }

    /// Add `citing` to the existing value set of `id` (creating it if needed)
    pub fn union_entry(&mut self, id: PaperId, citing: impl IntoIterator<Item = PaperId>) {
        self.entries.entry(id).or_default().extend(citing);
    }

    pub fn remove(&mut self, id: &str) -> Option<BTreeSet<PaperId>> {
        self.entries.remove(id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PaperId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PaperId, BTreeSet<PaperId>> {
        self.entries.iter()
    }

    /// Every identifier appearing in any value set
    pub fn referenced_ids(&self) -> BTreeSet<&PaperId> {
        self.entries.values().flatten().collect()
    }

    /// Referenced identifiers that are not themselves keys
    pub fn missing_leaves(&self) -> BTreeSet<PaperId> {
        self.entries
            .values()
            .flatten()
            .filter(|id| !self.entries.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    /// Insert an empty entry for every referenced but unseen identifier.
    ///
    /// Returns how many entries were added. Running it again adds nothing.
    pub fn normalize_leaves(&mut self) -> usize {
        let missing = self.missing_leaves();
        let added = missing.len();
        for id in missing {
            self.entries.insert(id, BTreeSet::new());
        }
        added
    }

    /// Whether every referenced identifier is also a key
    pub fn is_leaf_closed(&self) -> bool {
        self.entries
            .values()
            .flatten()
            .all(|id| self.entries.contains_key(id.as_str()))
    }

    /// All `(cited, citing)` pairs
    pub fn edges(&self) -> impl Iterator<Item = CitationEdge> + '_ {
        self.entries.iter().flat_map(|(cited, citing)| {
            citing.iter().map(move |c| CitationEdge {
                cited: cited.clone(),
                citing: c.clone(),
            })
        })
    }

    pub fn edge_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Whether every key of `self` is also a key of `other`
    pub fn keys_subset_of(&self, other: &AdjacencyMap) -> bool {
        self.entries.keys().all(|k| other.entries.contains_key(k))
    }
}

impl FromIterator<(PaperId, BTreeSet<PaperId>)> for AdjacencyMap {
    fn from_iter<T: IntoIterator<Item = (PaperId, BTreeSet<PaperId>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AdjacencyMap {
    type Item = (PaperId, BTreeSet<PaperId>);
    type IntoIter = btree_map::IntoIter<PaperId, BTreeSet<PaperId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AdjacencyMap {
    type Item = (&'a PaperId, &'a BTreeSet<PaperId>);
    type IntoIter = btree_map::Iter<'a, PaperId, BTreeSet<PaperId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
