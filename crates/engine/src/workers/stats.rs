//! Restartable statistics worker
//!
//! Only the most recent request matters. Starting a new computation aborts
//! the one in flight and results carrying an older generation are dropped.

use crate::graph::{compute_statistics, NetworkStatistics};
use citedin_common::model::AdjacencyMap;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Message from the statistics worker
#[derive(Debug, Clone, PartialEq)]
pub enum StatsMessage {
    End {
        generation: u64,
        depth: usize,
        stats: NetworkStatistics,
    },
}

/// Statistics worker handle
pub struct StatsWorker {
    generation: u64,
    handle: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<StatsMessage>,
}

impl StatsWorker {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatsMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            generation: 0,
            handle: None,
            tx,
        };
        (worker, rx)
    }

    /// Abort any computation in flight and start one for `graph`
    pub fn restart(&mut self, depth: usize, graph: AdjacencyMap) -> u64 {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!(generation = self.generation, "Aborting stale statistics computation");
            }
            handle.abort();
        }

        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();

        self.handle = Some(tokio::spawn(async move {
            let stats = tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                let stats = compute_statistics(&graph);
                citedin_common::metrics::record_settle("stats", start.elapsed().as_secs_f64());
                stats
            })
            .await;

            if let Ok(stats) = stats {
                let _ = tx.send(StatsMessage::End {
                    generation,
                    depth,
                    stats,
                });
            }
        }));

        generation
    }

    /// Whether `message` answers the latest request
    pub fn accept(&self, message: &StatsMessage) -> bool {
        match message {
            StatsMessage::End { generation, .. } => *generation == self.generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for StatsWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> AdjacencyMap {
        AdjacencyMap::from_lists([("A", vec!["B", "C"]), ("B", vec!["C"]), ("C", vec![])])
    }

    #[tokio::test]
    async fn test_result_for_latest_generation() {
        let (mut worker, mut rx) = StatsWorker::new();

        let generation = worker.restart(2, triangle());
        let message = rx.recv().await.unwrap();

        assert!(worker.accept(&message));
        let StatsMessage::End { generation: got, depth, stats } = message;
        assert_eq!(got, generation);
        assert_eq!(depth, 2);
        assert_eq!(stats.avg_clustering, 1.0);
    }

    #[tokio::test]
    async fn test_stale_result_rejected() {
        let (mut worker, _rx) = StatsWorker::new();
        worker.restart(1, triangle());
        worker.restart(2, AdjacencyMap::new());

        let stale = StatsMessage::End {
            generation: 1,
            depth: 1,
            stats: NetworkStatistics::default(),
        };

        assert_eq!(worker.generation(), 2);
        assert!(!worker.accept(&stale));
    }
}
