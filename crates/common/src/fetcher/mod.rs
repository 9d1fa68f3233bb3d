//! Citation fetcher abstraction
//!
//! Contract consumed by the engine: given a set of paper ids, eventually
//! return a mapping from each id to the set of ids citing it. Batching,
//! request method and pacing are internal to each implementation.
//!
//! Implementations:
//! - [`EutilsFetcher`]: NCBI E-utilities `elink` over HTTP
//! - [`InMemoryFetcher`]: serves a fixed citation graph, records calls

mod eutils;
mod memory;

pub use eutils::{parse_elink_response, EutilsFetcher, RequestMethod};
pub use memory::InMemoryFetcher;

use crate::errors::Result;
use crate::model::{AdjacencyMap, PaperId};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for citation lookups
#[async_trait]
pub trait CitationFetcher: Send + Sync {
    /// Fetch the citing papers of every id in `ids`.
    ///
    /// Empty input must resolve to an empty map without any network access.
    /// Fractions reported through `progress` are monotonically increasing
    /// within one call and end at 1.0 when the call had work to do.
    async fn fetch_citations(&self, ids: &[PaperId], progress: &BatchProgress) -> Result<AdjacencyMap>;

    /// Short name for logs and metrics
    fn name(&self) -> &str;
}

/// Sink for partial progress within one logical fetch
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    sender: Option<mpsc::UnboundedSender<f64>>,
}

impl BatchProgress {
    /// Progress reports are dropped
    pub fn silent() -> Self {
        Self { sender: None }
    }

    /// Forward progress reports to `sender`
    pub fn channel(sender: mpsc::UnboundedSender<f64>) -> Self {
        Self { sender: Some(sender) }
    }

    /// Report that `fraction` of the current fetch is done
    pub fn report(&self, fraction: f64) {
        if let Some(sender) = &self.sender {
            // Receiver gone means nobody is watching progress any more
            let _ = sender.send(fraction.clamp(0.0, 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = BatchProgress::channel(tx);

        progress.report(1.5);
        progress.report(-0.2);

        assert_eq!(rx.try_recv().unwrap(), 1.0);
        assert_eq!(rx.try_recv().unwrap(), 0.0);
    }

    #[test]
    fn test_silent_progress_does_not_panic() {
        BatchProgress::silent().report(0.5);
    }
}
