//! Fetcher serving a fixed citation graph
//!
//! Used for offline runs from a fixture file and as a test double. Every
//! call is recorded so callers can assert on network traffic.

use super::{BatchProgress, CitationFetcher};
use crate::errors::{AppError, Result};
use crate::model::{AdjacencyMap, PaperId};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory citation source
pub struct InMemoryFetcher {
    graph: AdjacencyMap,
    calls: Mutex<Vec<Vec<PaperId>>>,
    fail_on_call: Option<usize>,
}

impl InMemoryFetcher {
    pub fn new(graph: AdjacencyMap) -> Self {
        Self {
            graph,
            calls: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    /// Make the `call`-th non-empty request (1-based) fail with an upstream error
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Ids of every non-empty request, in order
    pub fn calls(&self) -> Vec<Vec<PaperId>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CitationFetcher for InMemoryFetcher {
    async fn fetch_citations(&self, ids: &[PaperId], progress: &BatchProgress) -> Result<AdjacencyMap> {
        if ids.is_empty() {
            return Ok(AdjacencyMap::new());
        }

        let call = {
            let mut calls = self.calls.lock().map_err(|_| AppError::Internal {
                message: "in-memory fetcher call log poisoned".to_string(),
            })?;
            calls.push(ids.to_vec());
            calls.len()
        };

        if self.fail_on_call == Some(call) {
            return Err(AppError::Upstream {
                status: 503,
                ids: ids.len(),
            });
        }

        let links: AdjacencyMap = ids
            .iter()
            .map(|id| {
                let citing = self.graph.get(id.as_str()).cloned().unwrap_or_default();
                (id.clone(), citing)
            })
            .collect();

        progress.report(1.0);
        Ok(links)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> AdjacencyMap {
        AdjacencyMap::from_lists([("100", vec!["200", "201"]), ("200", vec!["300"])])
    }

    #[tokio::test]
    async fn test_serves_requested_entries_only() {
        let fetcher = InMemoryFetcher::new(universe());
        let ids = vec![PaperId::from("200"), PaperId::from("201")];

        let links = fetcher.fetch_citations(&ids, &BatchProgress::silent()).await.unwrap();

        assert_eq!(links, AdjacencyMap::from_lists([("200", vec!["300"]), ("201", vec![])]));
        assert_eq!(fetcher.calls(), vec![ids]);
    }

    #[test]
    fn test_empty_request_not_recorded() {
        let fetcher = InMemoryFetcher::new(universe());
        let links = tokio_test::block_on(fetcher.fetch_citations(&[], &BatchProgress::silent())).unwrap();
        assert!(links.is_empty());
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let fetcher = InMemoryFetcher::new(universe()).failing_on_call(1);
        let result = fetcher
            .fetch_citations(&[PaperId::from("100")], &BatchProgress::silent())
            .await;
        assert!(matches!(result, Err(AppError::Upstream { status: 503, .. })));
    }
}
