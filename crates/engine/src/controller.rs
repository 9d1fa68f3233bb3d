//! Depth controller
//!
//! State machine driving the build of the citation graph:
//!
//! ```text
//! Idle ──open──▶ FetchingBatch{n} ──▶ … ──▶ FetchingBatch{1} ──▶ Settling ──▶ Displayed
//!                                                                   ▲            │
//!                                                                   └─set_depth──┘
//! ```
//!
//! Depth changes inside the range already fetched are served from the
//! accumulator's `max` graph and skip the fetching states entirely.
//!
//! Level `k` of the depth index holds the ids introduced by the `k`-th
//! fetch, so at displayed depth `n` the ids of level `n` are leaves.

use crate::graph::GraphAccumulator;
use crate::progress::FetchObserver;
use crate::workers::{spawn_fetch, FetchMessage};
use citedin_common::errors::{AppError, Result};
use citedin_common::fetcher::CitationFetcher;
use citedin_common::metrics;
use citedin_common::model::{AdjacencyMap, PaperId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    FetchingBatch { remaining: usize },
    Settling,
    Displayed,
}

impl ControllerState {
    /// States in which a new depth request is accepted
    pub fn is_stable(&self) -> bool {
        matches!(self, ControllerState::Idle | ControllerState::Displayed)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "idle"),
            ControllerState::FetchingBatch { remaining } => write!(f, "fetching ({remaining} remaining)"),
            ControllerState::Settling => write!(f, "settling"),
            ControllerState::Displayed => write!(f, "displayed"),
        }
    }
}

/// One exploration rooted at a single paper
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    root: PaperId,
    depth: usize,
    graph: GraphAccumulator,
}

impl Session {
    fn new(root: PaperId) -> Self {
        Self {
            id: Uuid::new_v4(),
            graph: GraphAccumulator::rooted(root.clone()),
            root,
            depth: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &PaperId {
        &self.root
    }

    /// Depth currently displayed
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Deepest level ever fetched in this session
    pub fn max_depth(&self) -> usize {
        self.graph.max_depth()
    }

    pub fn graph(&self) -> &GraphAccumulator {
        &self.graph
    }

    pub fn current(&self) -> &AdjacencyMap {
        self.graph.current()
    }
}

/// What a depth request will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepthPlan {
    /// Fresh session: fetch `iterations` levels from the root
    Initial { iterations: usize },

    /// Beyond the deepest level fetched: replay `max`, then fetch
    /// `iterations` levels starting at `from_level`
    Extend { from_level: usize, iterations: usize },

    /// Within the fetched range: copy levels `[from, to]` back from `max`
    Restore { from: usize, to: usize },

    /// Drop levels `[from, to]` from the displayed graph
    Shrink { from: usize, to: usize },

    /// Same depth: re-render only
    Unchanged,
}

impl DepthPlan {
    /// Number of network round trips the plan needs
    pub fn fetch_iterations(&self) -> usize {
        match self {
            DepthPlan::Initial { iterations } | DepthPlan::Extend { iterations, .. } => *iterations,
            _ => 0,
        }
    }
}

/// Depth controller owning the session
pub struct DepthController {
    fetcher: Arc<dyn CitationFetcher>,
    request_delay: Duration,
    session: Option<Session>,
    state: ControllerState,
}

impl DepthController {
    pub fn new(fetcher: Arc<dyn CitationFetcher>, request_delay: Duration) -> Self {
        Self {
            fetcher,
            request_delay,
            session: None,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn check_request(&self, depth: usize) -> Result<()> {
        if depth < 1 {
            return Err(AppError::InvalidDepth { depth });
        }
        if !self.state.is_stable() {
            return Err(AppError::InvalidState {
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Plan for an initial build at `depth`
    pub fn plan_open(&self, depth: usize) -> Result<DepthPlan> {
        self.check_request(depth)?;
        Ok(DepthPlan::Initial { iterations: depth })
    }

    /// Plan for moving the open session to `target`
    pub fn plan(&self, target: usize) -> Result<DepthPlan> {
        self.check_request(target)?;
        let session = self.session.as_ref().ok_or_else(|| AppError::InvalidState {
            state: "idle without a session".to_string(),
        })?;

        let (depth, max_depth) = (session.depth, session.max_depth());
        let plan = if target == depth {
            DepthPlan::Unchanged
        } else if target < depth {
            DepthPlan::Shrink {
                from: target,
                to: max_depth,
            }
        } else if target <= max_depth {
            DepthPlan::Restore {
                from: depth,
                to: target - 1,
            }
        } else {
            DepthPlan::Extend {
                from_level: max_depth,
                iterations: target - max_depth,
            }
        };
        Ok(plan)
    }

    /// Start a new session at `root` and build it to `depth`.
    ///
    /// On failure any previous session is kept unchanged.
    #[instrument(skip(self, root, observer), fields(root = %root))]
    pub async fn open(&mut self, root: PaperId, depth: usize, observer: &mut dyn FetchObserver) -> Result<DepthPlan> {
        let plan = self.plan_open(depth)?;
        let previous = self.state;

        let mut session = Session::new(root);
        info!(session_id = %session.id(), depth, "Opening session");

        if let Err(e) = fetch_levels(
            &self.fetcher,
            self.request_delay,
            &mut session.graph,
            &mut self.state,
            0,
            depth,
            observer,
        )
        .await
        {
            warn!(error = %e, "Initial build aborted");
            self.state = previous;
            return Err(e);
        }

        session.graph.normalize_leaves();
        session.graph.promote_to_max();
        session.depth = depth;
        metrics::record_graph(depth, session.current().len());

        self.session = Some(session);
        self.state = ControllerState::Settling;
        Ok(plan)
    }

    /// Move the open session to `target`.
    ///
    /// A failed fetch rolls the displayed graph and the depth index back to
    /// their contents before the call and returns to `Displayed`.
    #[instrument(skip(self, observer))]
    pub async fn set_depth(&mut self, target: usize, observer: &mut dyn FetchObserver) -> Result<DepthPlan> {
        let plan = self.plan(target)?;
        let session = self.session.as_mut().ok_or_else(|| AppError::InvalidState {
            state: "idle without a session".to_string(),
        })?;

        match plan {
            DepthPlan::Unchanged => debug!(depth = target, "Depth unchanged, re-rendering"),
            DepthPlan::Shrink { from, to } => {
                let removed = session.graph.remove_depth_range(from, to);
                session.graph.normalize_leaves();
                metrics::record_cache_replay("shrink");
                debug!(removed, "Shrunk displayed graph");
            }
            DepthPlan::Restore { from, to } => {
                let restored = session.graph.restore_depth_range(from, to);
                session.graph.normalize_leaves();
                metrics::record_cache_replay("restore");
                debug!(restored, "Restored levels from max graph");
            }
            DepthPlan::Extend { from_level, iterations } => {
                let checkpoint = session.graph.checkpoint();
                session.graph.load_max();

                if let Err(e) = fetch_levels(
                    &self.fetcher,
                    self.request_delay,
                    &mut session.graph,
                    &mut self.state,
                    from_level,
                    iterations,
                    observer,
                )
                .await
                {
                    warn!(error = %e, depth = target, "Depth extension aborted, rolling back");
                    session.graph.rollback(checkpoint);
                    self.state = ControllerState::Displayed;
                    return Err(e);
                }

                session.graph.normalize_leaves();
                session.graph.promote_to_max();
            }
            DepthPlan::Initial { .. } => {}
        }

        session.depth = target;
        metrics::record_graph(target, session.current().len());
        self.state = ControllerState::Settling;
        Ok(plan)
    }

    /// Layout and statistics are under way; accept requests again
    pub fn finish_settling(&mut self) -> Result<()> {
        if self.state != ControllerState::Settling {
            return Err(AppError::InvalidState {
                state: self.state.to_string(),
            });
        }
        self.state = ControllerState::Displayed;
        Ok(())
    }
}

/// Fetch `iterations` levels, the first one requesting the ids of
/// `start_level`. Each level is recorded even when it introduces nothing.
async fn fetch_levels(
    fetcher: &Arc<dyn CitationFetcher>,
    request_delay: Duration,
    graph: &mut GraphAccumulator,
    state: &mut ControllerState,
    start_level: usize,
    iterations: usize,
    observer: &mut dyn FetchObserver,
) -> Result<()> {
    let mut remaining = iterations;
    let mut level = start_level;

    while remaining > 0 {
        *state = ControllerState::FetchingBatch { remaining };

        let ids: Vec<PaperId> = graph
            .depth_index()
            .level(level)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();

        tokio::time::sleep(request_delay).await;
        debug!(level, ids = ids.len(), remaining, "Requesting citations");

        let mut rx = spawn_fetch(Arc::clone(fetcher), ids);
        let fragment = loop {
            match rx.recv().await {
                Some(FetchMessage::BatchEnd { fraction }) => observer.on_batch_progress(fraction),
                Some(FetchMessage::End { links }) => break links?,
                None => {
                    return Err(AppError::WorkerStopped {
                        worker: "fetch".to_string(),
                    })
                }
            }
        };

        let introduced = graph.newly_introduced(&fragment);
        debug!(level = level + 1, introduced = introduced.len(), "Level fetched");
        graph.record_level(level + 1, introduced);
        graph.merge(fragment);
        observer.on_batch_complete();

        level += 1;
        remaining -= 1;
    }

    Ok(())
}
