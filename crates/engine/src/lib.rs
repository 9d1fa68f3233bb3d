//! citedin Engine
//!
//! Incremental construction of a "cited-by" graph around one root paper:
//! - `graph`: accumulator with the displayed and maximal graphs, statistics,
//!   presentation payload
//! - `controller`: depth state machine and session
//! - `progress`: two-phase progress tracking
//! - `layout`: force-directed settling
//! - `workers`: fetch, layout and statistics tasks
//! - `explorer`: event loop tying the above together

pub mod controller;
pub mod explorer;
pub mod graph;
pub mod layout;
pub mod progress;
pub mod workers;

pub use controller::{ControllerState, DepthController, DepthPlan, Session};
pub use explorer::{Command, Explorer, ExplorerEvent, ExplorerHandle, ExplorerSettings, Rendering};
pub use graph::{compute_statistics, GraphAccumulator, GraphPayload, NetworkStatistics};
pub use layout::{ForceLayout, ForceLayoutConfig, Layout, LayoutEngine, Quality};
pub use progress::{FetchObserver, ProgressTracker};
