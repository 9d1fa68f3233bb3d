//! Depth-indexed citation graph store
//!
//! Holds the graph currently displayed (`current`), the largest graph ever
//! assembled (`max`) and the record of which ids each depth introduced.
//! `max` is a cache: shrinking and regrowing the displayed depth is served
//! from it without any network access.

use citedin_common::model::{AdjacencyMap, DepthIndex, PaperId};
use std::collections::BTreeSet;
use tracing::debug;

/// Saved `current` + depth index, used to roll back an aborted fetch
#[derive(Debug, Clone)]
pub struct Checkpoint {
    current: AdjacencyMap,
    depth_index: DepthIndex,
}

/// Graph accumulator for one session
#[derive(Debug, Clone, Default)]
pub struct GraphAccumulator {
    current: AdjacencyMap,
    max: AdjacencyMap,
    depth_index: DepthIndex,
}

impl GraphAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh graph at `root`: level 0 is `{root}` and the root is a key
    pub fn rooted(root: PaperId) -> Self {
        let mut current = AdjacencyMap::new();
        current.insert(root.clone(), BTreeSet::new());
        Self {
            current,
            max: AdjacencyMap::new(),
            depth_index: DepthIndex::rooted(root),
        }
    }

    pub fn current(&self) -> &AdjacencyMap {
        &self.current
    }

    pub fn max(&self) -> &AdjacencyMap {
        &self.max
    }

    pub fn depth_index(&self) -> &DepthIndex {
        &self.depth_index
    }

    /// Deepest level fetched so far
    pub fn max_depth(&self) -> usize {
        self.depth_index.max_depth().unwrap_or(0)
    }

    /// Ids in a fetch response that the graph has never seen.
    ///
    /// Ids already recorded at an earlier level are excluded as well as
    /// current keys, which keeps the levels pairwise disjoint.
    pub fn newly_introduced(&self, fragment: &AdjacencyMap) -> BTreeSet<PaperId> {
        fragment
            .referenced_ids()
            .into_iter()
            .filter(|id| !self.current.contains(id.as_str()))
            .filter(|id| self.depth_index.depth_of(id.as_str()).is_none())
            .cloned()
            .collect()
    }

    /// Record the ids first introduced at `depth`
    pub fn record_level(&mut self, depth: usize, ids: BTreeSet<PaperId>) {
        self.depth_index.record(depth, ids);
    }

    /// Union every entry of `fragment` into `current`, overwriting keys
    pub fn merge(&mut self, fragment: AdjacencyMap) {
        for (id, citing) in fragment {
            self.current.insert(id, citing);
        }
    }

    /// Insert empty entries for referenced but unseen ids. Idempotent.
    pub fn normalize_leaves(&mut self) -> usize {
        self.current.normalize_leaves()
    }

    /// Copy `current` into `max` when it has more keys. Never removes keys.
    pub fn promote_to_max(&mut self) -> bool {
        if self.current.len() <= self.max.len() {
            return false;
        }
        for (id, citing) in self.current.iter() {
            self.max.insert(id.clone(), citing.clone());
        }
        debug!(nodes = self.max.len(), "Promoted current graph to max");
        true
    }

    /// Copy every entry of `max` into `current`
    pub fn load_max(&mut self) {
        for (id, citing) in self.max.iter() {
            self.current.insert(id.clone(), citing.clone());
        }
    }

    /// Delete from `current` every id introduced at depths `[from, to]`
    pub fn remove_depth_range(&mut self, from: usize, to: usize) -> usize {
        let ids: Vec<PaperId> = self.depth_index.ids_in_range(from, to).cloned().collect();
        ids.iter()
            .filter(|id| self.current.remove(id.as_str()).is_some())
            .count()
    }

    /// Copy from `max` into `current` every id introduced at depths `[from, to]`.
    ///
    /// Ids missing from `max` stay absent; the graph is simply smaller.
    pub fn restore_depth_range(&mut self, from: usize, to: usize) -> usize {
        let mut restored = 0;
        let mut missing = 0;
        for id in self.depth_index.ids_in_range(from, to) {
            match self.max.get(id.as_str()) {
                Some(citing) => {
                    self.current.insert(id.clone(), citing.clone());
                    restored += 1;
                }
                None => missing += 1,
            }
        }
        if missing > 0 {
            debug!(missing, from, to, "Restore skipped ids absent from max");
        }
        restored
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            current: self.current.clone(),
            depth_index: self.depth_index.clone(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.current = checkpoint.current;
        self.depth_index = checkpoint.depth_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> BTreeSet<PaperId> {
        list.iter().map(|id| PaperId::from(*id)).collect()
    }

    /// Depth-2 graph rooted at 100, held in both current and max
    fn depth_two() -> GraphAccumulator {
        let mut graph = GraphAccumulator::rooted("100".into());
        graph.merge(AdjacencyMap::from_lists([("100", vec!["200", "201"])]));
        graph.record_level(1, ids(&["200", "201"]));
        graph.merge(AdjacencyMap::from_lists([("200", vec!["300"]), ("201", vec![])]));
        graph.record_level(2, ids(&["300"]));
        graph.normalize_leaves();
        graph.promote_to_max();
        graph
    }

    #[test]
    fn test_newly_introduced_excludes_known_ids() {
        let mut graph = GraphAccumulator::rooted("100".into());
        graph.merge(AdjacencyMap::from_lists([("100", vec!["200", "201"])]));
        graph.record_level(1, ids(&["200", "201"]));

        // 201 cites 200 and 100 cites nothing new
        let fragment = AdjacencyMap::from_lists([("200", vec!["201", "300"]), ("201", vec!["100"])]);

        assert_eq!(graph.newly_introduced(&fragment), ids(&["300"]));
    }

    #[test]
    fn test_promote_is_additive_and_size_gated() {
        let mut graph = depth_two();
        assert_eq!(graph.max().len(), 4);

        graph.remove_depth_range(1, 2);
        graph.normalize_leaves();
        assert!(!graph.promote_to_max());
        assert_eq!(graph.max().len(), 4);
        assert!(graph.current().keys_subset_of(graph.max()));
    }

    #[test]
    fn test_remove_then_restore_round_trip() {
        let mut graph = depth_two();
        let at_two = graph.current().clone();

        graph.remove_depth_range(1, 2);
        graph.normalize_leaves();
        assert_eq!(
            graph.current(),
            &AdjacencyMap::from_lists([("100", vec!["200", "201"]), ("200", vec![]), ("201", vec![])])
        );

        graph.restore_depth_range(1, 1);
        graph.normalize_leaves();
        assert_eq!(graph.current(), &at_two);
    }

    #[test]
    fn test_restore_miss_leaves_entry_absent() {
        let mut graph = GraphAccumulator::rooted("100".into());
        graph.record_level(1, ids(&["200"]));

        let restored = graph.restore_depth_range(1, 1);

        assert_eq!(restored, 0);
        assert!(!graph.current().contains("200"));
    }

    #[test]
    fn test_load_max_and_rollback() {
        let mut graph = depth_two();
        graph.remove_depth_range(1, 2);
        graph.normalize_leaves();
        let checkpoint = graph.checkpoint();

        graph.load_max();
        graph.record_level(3, ids(&["400"]));
        assert_eq!(graph.current().len(), 4);

        graph.rollback(checkpoint);
        assert_eq!(graph.current().len(), 3);
        assert_eq!(graph.max_depth(), 2);
    }
}
