//! Background workers
//!
//! Each worker runs as its own task and reports to the explorer loop over a
//! channel. Messages are tagged; the loop dispatches on the tag.

mod fetch;
mod layout;
mod stats;

pub use fetch::{spawn_fetch, FetchMessage};
pub use layout::{spawn_layout, LayoutMessage};
pub use stats::{StatsMessage, StatsWorker};
