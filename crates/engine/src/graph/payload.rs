//! Graph payload handed to the presentation layer

use citedin_common::model::{AdjacencyMap, DepthIndex, PaperId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node of the displayed graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: PaperId,

    /// Level at which the paper was first reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,

    pub is_root: bool,
}

/// Link drawn from the cited paper to the paper citing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    /// Index into `nodes` of the cited paper
    pub source: usize,

    /// Index into `nodes` of the citing paper
    pub target: usize,
}

/// Finished node/link sets for one displayed depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub root: PaperId,
    pub depth: usize,
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphPayload {
    /// Build the payload from the displayed adjacency map.
    ///
    /// Links whose endpoint is not a key are skipped; after leaf
    /// normalization there are none.
    pub fn build(root: &PaperId, depth: usize, graph: &AdjacencyMap, depth_index: &DepthIndex) -> Self {
        let nodes: Vec<GraphNode> = graph
            .keys()
            .map(|id| GraphNode {
                id: id.clone(),
                depth: depth_index.depth_of(id.as_str()),
                is_root: id == root,
            })
            .collect();

        let index: HashMap<&PaperId, usize> = nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();

        let links = graph
            .iter()
            .flat_map(|(cited, citing)| citing.iter().map(move |c| (cited, c)))
            .filter_map(|(cited, citing)| {
                Some(GraphLink {
                    source: *index.get(cited)?,
                    target: *index.get(citing)?,
                })
            })
            .collect();

        Self {
            root: root.clone(),
            depth,
            nodes,
            links,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
