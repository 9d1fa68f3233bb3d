//! Network statistics for the displayed graph
//!
//! Clustering is computed on the symmetrized graph: a citation in either
//! direction makes two papers neighbours.

use crate::progress::round2;
use citedin_common::model::{AdjacencyMap, PaperId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Summary statistics of one graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatistics {
    /// Number of keys in the adjacency map
    pub node_count: usize,

    /// Smallest out-degree (fold seeded at 0)
    pub min_degree: usize,

    /// Largest out-degree (fold seeded at 0)
    pub max_degree: usize,

    /// Mean local clustering coefficient, 2 decimals
    pub avg_clustering: f64,

    /// Smallest local clustering coefficient (fold seeded at 0), 2 decimals
    pub min_clustering: f64,

    /// Largest local clustering coefficient, 2 decimals
    pub max_clustering: f64,
}

/// Local clustering coefficient of every node.
///
/// With `k = |N(v)|`, nodes with `k < 2` score 0; otherwise the score is the
/// number of ordered neighbour pairs that are adjacent divided by
/// `k * (k - 1)`. Self-citations do not make a node its own neighbour.
pub fn local_clustering(graph: &AdjacencyMap) -> BTreeMap<PaperId, f64> {
    let mut nodes: BTreeSet<&PaperId> = graph.keys().collect();
    nodes.extend(graph.referenced_ids());
    let nodes: Vec<&PaperId> = nodes.into_iter().collect();

    let index: HashMap<&PaperId, usize> = nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut neighbours: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
    for (cited, citing) in graph.iter() {
        let a = index[cited];
        for c in citing {
            let b = index[c];
            if a != b {
                neighbours[a].insert(b);
                neighbours[b].insert(a);
            }
        }
    }

    nodes
        .iter()
        .enumerate()
        .map(|(v, id)| {
            let own = &neighbours[v];
            let k = own.len();
            let coefficient = if k < 2 {
                0.0
            } else {
                let linked: usize = own
                    .iter()
                    .map(|&n| own.intersection(&neighbours[n]).count())
                    .sum();
                linked as f64 / (k * (k - 1)) as f64
            };
            ((*id).clone(), coefficient)
        })
        .collect()
}

/// Compute the statistics record for `graph`
pub fn compute_statistics(graph: &AdjacencyMap) -> NetworkStatistics {
    if graph.is_empty() {
        return NetworkStatistics::default();
    }

    let local = local_clustering(graph);
    let avg = local.values().sum::<f64>() / local.len() as f64;

    // Folds are seeded at 0, so both minimums always report 0
    let min_clustering = local.values().copied().fold(0.0, f64::min);
    let max_clustering = local.values().copied().fold(0.0, f64::max);
    let min_degree = graph.iter().map(|(_, citing)| citing.len()).fold(0, usize::min);
    let max_degree = graph.iter().map(|(_, citing)| citing.len()).fold(0, usize::max);

    NetworkStatistics {
        node_count: graph.len(),
        min_degree,
        max_degree,
        avg_clustering: round2(avg),
        min_clustering: round2(min_clustering),
        max_clustering: round2(max_clustering),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle() {
        // A-B, A-C, B-C once symmetrized
        let graph = AdjacencyMap::from_lists([("A", vec!["B", "C"]), ("B", vec!["C"]), ("C", vec![])]);

        let local = local_clustering(&graph);
        assert!(local.values().all(|&c| c == 1.0));

        let stats = compute_statistics(&graph);
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.avg_clustering, 1.0);
        assert_eq!(stats.max_clustering, 1.0);
        assert_eq!(stats.min_degree, 0);
        assert_eq!(stats.max_degree, 2);
    }

    #[test]
    fn test_min_folds_are_seeded_at_zero() {
        // Every node has out-degree >= 1 and clustering 1.0, yet the
        // seeded folds still report 0
        let graph = AdjacencyMap::from_lists([("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["A"])]);

        let stats = compute_statistics(&graph);

        assert_eq!(stats.avg_clustering, 1.0);
        assert_eq!(stats.min_degree, 0);
        assert_eq!(stats.min_clustering, 0.0);
    }

    #[test]
    fn test_star_has_zero_clustering() {
        let graph = AdjacencyMap::from_lists([
            ("hub", vec!["a", "b", "c"]),
            ("a", vec![]),
            ("b", vec![]),
            ("c", vec![]),
        ]);

        let stats = compute_statistics(&graph);

        assert_eq!(stats.avg_clustering, 0.0);
        assert_eq!(stats.max_clustering, 0.0);
        assert_eq!(stats.max_degree, 3);
        assert_eq!(stats.node_count, 4);
    }

    #[test]
    fn test_partial_clustering_rounded() {
        // hub has neighbours a, b, c with only a-b linked: 2 / (3 * 2)
        let graph = AdjacencyMap::from_lists([
            ("hub", vec!["a", "b", "c"]),
            ("a", vec!["b"]),
            ("b", vec![]),
            ("c", vec![]),
        ]);

        let local = local_clustering(&graph);
        assert!((local["hub"] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(local["c"], 0.0);

        let stats = compute_statistics(&graph);
        // (1/3 + 1 + 1 + 0) / 4
        assert_eq!(stats.avg_clustering, 0.58);
        assert_eq!(stats.max_clustering, 1.0);
    }

    #[test]
    fn test_self_citation_ignored() {
        let graph = AdjacencyMap::from_lists([("A", vec!["A", "B"]), ("B", vec![])]);
        let local = local_clustering(&graph);
        assert_eq!(local["A"], 0.0);
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(compute_statistics(&AdjacencyMap::new()), NetworkStatistics::default());
    }
}
