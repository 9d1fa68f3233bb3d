//! Citation graph data model
//!
//! In-memory types shared by the fetcher and the engine. Nothing here is
//! persisted; a session creates them empty and drops them when it ends.

mod adjacency;
mod depth_index;
mod paper;

pub use adjacency::{AdjacencyMap, CitationEdge};
pub use depth_index::DepthIndex;
pub use paper::PaperId;
