//! Drives an explorer through a depth sequence and collects what it emits

use citedin_engine::{ExplorerEvent, ExplorerHandle, NetworkStatistics, Rendering};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Everything one run produced
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub root: String,
    pub renderings: Vec<Rendering>,
    pub statistics: BTreeMap<usize, NetworkStatistics>,
    pub rejected: Vec<Rejection>,
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Rejection {
    pub depth: usize,
    pub reason: String,
}

impl Report {
    /// Store `event`; true when it ends the operation in flight
    fn record(&mut self, event: ExplorerEvent) -> bool {
        match event {
            ExplorerEvent::Rendered(rendering) => {
                info!(
                    depth = rendering.depth,
                    nodes = rendering.payload.node_count(),
                    links = rendering.payload.link_count(),
                    "Depth settled"
                );
                self.renderings.push(rendering);
                true
            }
            ExplorerEvent::Statistics { depth, stats, .. } => {
                self.statistics.insert(depth, stats);
                false
            }
            ExplorerEvent::Rejected { depth, reason } => {
                warn!(depth, %reason, "Depth rejected");
                self.rejected.push(Rejection { depth, reason });
                true
            }
            ExplorerEvent::Failed { message } => {
                self.failures.push(message);
                true
            }
        }
    }

    /// Statistics of the last settled depth have arrived, or there is none
    fn complete(&self) -> bool {
        self.renderings
            .last()
            .map_or(true, |last| self.statistics.contains_key(&last.depth))
    }
}

/// Wait for the initial build, then request each depth of `then` in turn.
///
/// The next depth is requested only once the previous operation finished
/// and the statistics of the depth it rendered are in, so no request is
/// turned away as busy and every rendered depth gets its statistics.
pub async fn drive(handle: &mut ExplorerHandle, root: String, then: &[usize]) -> anyhow::Result<Report> {
    let mut report = Report {
        root,
        ..Report::default()
    };
    let mut pending = then.iter().copied();
    let mut finished = false;

    while let Some(event) = handle.next_event().await {
        finished |= report.record(event);
        if finished && report.complete() {
            match pending.next() {
                Some(depth) => {
                    finished = false;
                    handle.set_depth(depth).await?;
                }
                None => break,
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use citedin_common::fetcher::InMemoryFetcher;
    use citedin_common::model::AdjacencyMap;
    use citedin_engine::{Explorer, ExplorerSettings, ForceLayout, ForceLayoutConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn(initial_depth: usize) -> (Arc<InMemoryFetcher>, ExplorerHandle) {
        let fetcher = Arc::new(InMemoryFetcher::new(AdjacencyMap::from_lists([
            ("100", vec!["200", "201"]),
            ("200", vec!["300"]),
            ("201", vec![]),
        ])));
        let layout = Arc::new(ForceLayout::new(ForceLayoutConfig {
            seed: Some(11),
            ..ForceLayoutConfig::default()
        }));
        let settings = ExplorerSettings {
            initial_depth,
            request_delay: Duration::from_millis(750),
            low_quality_threshold: 500,
        };
        let handle = Explorer::spawn("100".into(), fetcher.clone(), layout, settings);
        (fetcher, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_depth_sequence() {
        let (fetcher, mut handle) = spawn(1);

        let report = drive(&mut handle, "100".to_string(), &[2, 1, 2]).await.unwrap();

        let depths: Vec<usize> = report.renderings.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![1, 2, 1, 2]);
        assert_eq!(report.statistics.len(), 2);
        assert_eq!(report.statistics[&2].node_count, 4);
        assert!(report.failures.is_empty());
        assert_eq!(fetcher.call_count(), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_depth_in_sequence() {
        let (_, mut handle) = spawn(1);

        let report = drive(&mut handle, "100".to_string(), &[0, 2]).await.unwrap();

        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].depth, 0);
        assert_eq!(report.renderings.last().map(|r| r.depth), Some(2));

        handle.shutdown().await.unwrap();
    }

    #[test]
    fn test_report_serializes() {
        let report = Report {
            root: "100".to_string(),
            ..Report::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["root"], "100");
        assert!(json["renderings"].as_array().unwrap().is_empty());
    }
}
