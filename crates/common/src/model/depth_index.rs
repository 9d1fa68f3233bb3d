//! Depth index: which papers were first introduced at each hop from the root

use super::PaperId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping from depth level to the identifiers first discovered there.
///
/// Level 0 holds exactly the root. Levels are pairwise disjoint because a
/// level only ever records identifiers not already known to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepthIndex {
    levels: BTreeMap<usize, BTreeSet<PaperId>>,
}

impl DepthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index whose level 0 is `{root}`
    pub fn rooted(root: PaperId) -> Self {
        let mut index = Self::new();
        index.record(0, BTreeSet::from([root]));
        index
    }

    /// Set the identifiers introduced at `depth`, replacing any previous record
    pub fn record(&mut self, depth: usize, ids: BTreeSet<PaperId>) {
        self.levels.insert(depth, ids);
    }

    pub fn level(&self, depth: usize) -> Option<&BTreeSet<PaperId>> {
        self.levels.get(&depth)
    }

    pub fn root(&self) -> Option<&PaperId> {
        self.levels.get(&0).and_then(|ids| ids.iter().next())
    }

    /// Deepest recorded level
    pub fn max_depth(&self) -> Option<usize> {
        self.levels.keys().next_back().copied()
    }

    /// Number of recorded levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Identifiers recorded for depths in `[from, to]`
    pub fn ids_in_range(&self, from: usize, to: usize) -> impl Iterator<Item = &PaperId> {
        let levels = if from <= to {
            Some(self.levels.range(from..=to))
        } else {
            None
        };
        levels.into_iter().flatten().flat_map(|(_, ids)| ids.iter())
    }

    /// Level at which `id` was introduced
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.levels
            .iter()
            .find(|(_, ids)| ids.contains(id))
            .map(|(depth, _)| *depth)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeSet<PaperId>)> {
        self.levels.iter().map(|(depth, ids)| (*depth, ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> BTreeSet<PaperId> {
        list.iter().map(|id| PaperId::from(*id)).collect()
    }

    #[test]
    fn test_rooted_index() {
        let index = DepthIndex::rooted("100".into());
        assert_eq!(index.root().map(PaperId::as_str), Some("100"));
        assert_eq!(index.max_depth(), Some(0));
        assert_eq!(index.depth_of("100"), Some(0));
    }

    #[test]
    fn test_range_queries() {
        let mut index = DepthIndex::rooted("100".into());
        index.record(1, ids(&["200", "201"]));
        index.record(2, ids(&["300"]));

        let deep: Vec<_> = index.ids_in_range(2, 2).map(PaperId::as_str).collect();
        assert_eq!(deep, vec!["300"]);
        assert_eq!(index.ids_in_range(1, 2).count(), 3);
        assert_eq!(index.ids_in_range(3, 1).count(), 0);
        assert_eq!(index.depth_of("201"), Some(1));
    }
}
