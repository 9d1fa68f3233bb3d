//! Citation graph: accumulation, statistics and the presentation payload

mod accumulator;
mod payload;
mod stats;

pub use accumulator::{Checkpoint, GraphAccumulator};
pub use payload::{GraphLink, GraphNode, GraphPayload};
pub use stats::{compute_statistics, local_clustering, NetworkStatistics};
