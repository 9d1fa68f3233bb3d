//! Fetch worker: one citation request per depth iteration

use citedin_common::errors::Result;
use citedin_common::fetcher::{BatchProgress, CitationFetcher};
use citedin_common::model::{AdjacencyMap, PaperId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Message from the fetch worker
#[derive(Debug)]
pub enum FetchMessage {
    /// A batch of the request finished; `fraction` of the request is done
    BatchEnd { fraction: f64 },

    /// The request finished; always the last message
    End { links: Result<AdjacencyMap> },
}

/// Request the citations of `ids` on a new task.
///
/// Batch progress is forwarded as it arrives, followed by exactly one
/// `End`. Dropping the receiver does not cancel the request.
pub fn spawn_fetch(fetcher: Arc<dyn CitationFetcher>, ids: Vec<PaperId>) -> mpsc::UnboundedReceiver<FetchMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(fetcher, ids, tx));
    rx
}

#[instrument(skip_all, fields(fetcher = fetcher.name(), ids = ids.len()))]
async fn run(fetcher: Arc<dyn CitationFetcher>, ids: Vec<PaperId>, tx: mpsc::UnboundedSender<FetchMessage>) {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let progress = BatchProgress::channel(progress_tx);

    let links = {
        let request = fetcher.fetch_citations(&ids, &progress);
        tokio::pin!(request);
        loop {
            tokio::select! {
                links = &mut request => break links,
                Some(fraction) = progress_rx.recv() => {
                    let _ = tx.send(FetchMessage::BatchEnd { fraction });
                }
            }
        }
    };

    // Reports sent just before the request resolved
    while let Ok(fraction) = progress_rx.try_recv() {
        let _ = tx.send(FetchMessage::BatchEnd { fraction });
    }

    debug!(ok = links.is_ok(), "Fetch worker finished");
    let _ = tx.send(FetchMessage::End { links });
}

#[cfg(test)]
mod tests {
    use super::*;
    use citedin_common::fetcher::InMemoryFetcher;

    #[tokio::test]
    async fn test_progress_then_end() {
        let graph = AdjacencyMap::from_lists([("1", vec!["2", "3"])]);
        let fetcher = Arc::new(InMemoryFetcher::new(graph));

        let mut rx = spawn_fetch(fetcher.clone(), vec!["1".into()]);

        let mut fractions = Vec::new();
        let links = loop {
            match rx.recv().await {
                Some(FetchMessage::BatchEnd { fraction }) => fractions.push(fraction),
                Some(FetchMessage::End { links }) => break links.unwrap(),
                None => panic!("worker dropped without End"),
            }
        };

        assert_eq!(fractions, vec![1.0]);
        assert_eq!(links.get("1").map(|c| c.len()), Some(2));
        assert_eq!(fetcher.call_count(), 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failure_is_delivered_as_end() {
        let fetcher = Arc::new(InMemoryFetcher::new(AdjacencyMap::new()).failing_on_call(1));

        let mut rx = spawn_fetch(fetcher, vec!["1".into()]);

        match rx.recv().await {
            Some(FetchMessage::End { links }) => assert!(links.unwrap_err().is_upstream_error()),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
