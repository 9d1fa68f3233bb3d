//! Explorer event loop
//!
//! A single task owns the depth controller and everything derived from it.
//! Drivers talk to it through an [`ExplorerHandle`]: depth commands go in,
//! renderings and statistics come out, and overall progress is published on
//! a watch channel.
//!
//! Only one operation runs at a time. Depth commands that arrive while a
//! build or settle is in flight are rejected, never queued; a shutdown
//! command arriving then is honoured once the operation finishes.

use crate::controller::DepthController;
use crate::graph::{GraphPayload, NetworkStatistics};
use crate::layout::{Layout, LayoutEngine, LayoutInput, Quality};
use crate::progress::{FetchObserver, ProgressTracker};
use crate::workers::{spawn_layout, LayoutMessage, StatsMessage, StatsWorker};
use citedin_common::config::ExplorerConfig;
use citedin_common::errors::{AppError, Result};
use citedin_common::fetcher::CitationFetcher;
use citedin_common::model::PaperId;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 16;

/// Driver command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetDepth(usize),
    Shutdown,
}

/// Settled graph for one depth
#[derive(Debug, Clone, Serialize)]
pub struct Rendering {
    pub depth: usize,
    pub quality: Quality,
    pub payload: GraphPayload,
    pub layout: Layout,
}

/// Event emitted by the explorer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExplorerEvent {
    Rendered(Rendering),
    Statistics {
        depth: usize,
        stats: NetworkStatistics,
        /// Served from the per-depth cache instead of a fresh computation
        cached: bool,
    },
    Rejected { depth: usize, reason: String },
    Failed { message: String },
}

/// Explorer settings
#[derive(Debug, Clone)]
pub struct ExplorerSettings {
    pub initial_depth: usize,
    pub request_delay: Duration,
    pub low_quality_threshold: usize,
}

impl From<&ExplorerConfig> for ExplorerSettings {
    fn from(config: &ExplorerConfig) -> Self {
        Self {
            initial_depth: config.initial_depth,
            request_delay: config.request_delay(),
            low_quality_threshold: config.low_quality_threshold,
        }
    }
}

/// Driver side of a running explorer
pub struct ExplorerHandle {
    commands: mpsc::Sender<Command>,
    events: mpsc::UnboundedReceiver<ExplorerEvent>,
    progress: watch::Receiver<f64>,
    task: JoinHandle<()>,
}

impl ExplorerHandle {
    /// Ask for a new displayed depth
    pub async fn set_depth(&self, depth: usize) -> Result<()> {
        self.send(Command::SetDepth(depth)).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).await.map_err(|_| AppError::WorkerStopped {
            worker: "explorer".to_string(),
        })
    }

    /// Next event, or `None` once the explorer has stopped
    pub async fn next_event(&mut self) -> Option<ExplorerEvent> {
        self.events.recv().await
    }

    /// Latest overall progress percentage
    pub fn progress(&self) -> f64 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress.clone()
    }

    /// Stop the explorer and wait for its task to finish
    pub async fn shutdown(self) -> Result<()> {
        // A closed channel means the loop already exited
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await?;
        Ok(())
    }
}

/// Fetch observer feeding the tracker and publishing each new percentage
struct Reporter<'a> {
    tracker: &'a mut ProgressTracker,
    progress: &'a watch::Sender<f64>,
}

impl Reporter<'_> {
    fn publish(&self) {
        self.progress.send_replace(self.tracker.current_percent());
    }
}

impl FetchObserver for Reporter<'_> {
    fn on_batch_progress(&mut self, fraction: f64) {
        self.tracker.on_batch_progress(fraction);
        self.publish();
    }

    fn on_batch_complete(&mut self) {
        self.tracker.on_batch_complete();
        self.publish();
    }
}

/// Explorer state owned by the loop task
pub struct Explorer {
    root: PaperId,
    settings: ExplorerSettings,
    controller: DepthController,
    layout: Arc<dyn LayoutEngine>,
    tracker: ProgressTracker,
    stats: StatsWorker,
    stats_rx: mpsc::UnboundedReceiver<StatsMessage>,
    stats_cache: HashMap<usize, NetworkStatistics>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<ExplorerEvent>,
    progress: watch::Sender<f64>,
    shutdown_requested: bool,
}

impl Explorer {
    /// Start an explorer rooted at `root`; the initial build begins at once
    pub fn spawn(
        root: PaperId,
        fetcher: Arc<dyn CitationFetcher>,
        layout: Arc<dyn LayoutEngine>,
        settings: ExplorerSettings,
    ) -> ExplorerHandle {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events, event_rx) = mpsc::unbounded_channel();
        let (progress, progress_rx) = watch::channel(0.0);
        let (stats, stats_rx) = StatsWorker::new();

        let explorer = Self {
            root,
            controller: DepthController::new(fetcher, settings.request_delay),
            settings,
            layout,
            tracker: ProgressTracker::new(),
            stats,
            stats_rx,
            stats_cache: HashMap::new(),
            commands,
            events,
            progress,
            shutdown_requested: false,
        };

        ExplorerHandle {
            commands: command_tx,
            events: event_rx,
            progress: progress_rx,
            task: tokio::spawn(explorer.run()),
        }
    }

    async fn run(mut self) {
        info!(root = %self.root, depth = self.settings.initial_depth, "Explorer started");

        self.open().await;

        while !self.shutdown_requested {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::SetDepth(depth)) => self.change_depth(depth).await,
                    Some(Command::Shutdown) | None => break,
                },
                Some(message) = self.stats_rx.recv() => self.on_stats(message),
            }
        }

        info!(root = %self.root, "Explorer stopped");
    }

    async fn open(&mut self) {
        let depth = self.settings.initial_depth;
        let plan = match self.controller.plan_open(depth) {
            Ok(plan) => plan,
            Err(e) => return self.reject(depth, &e),
        };

        self.tracker.start_phase_one(plan.fetch_iterations());
        self.progress.send_replace(self.tracker.current_percent());

        let mut reporter = Reporter {
            tracker: &mut self.tracker,
            progress: &self.progress,
        };
        let result = while_busy(
            self.controller.open(self.root.clone(), depth, &mut reporter),
            &mut self.commands,
            &self.events,
            &mut self.shutdown_requested,
        )
        .await;

        match result {
            Ok(_) => self.settle().await,
            Err(e) => self.fail(&e),
        }
    }

    async fn change_depth(&mut self, depth: usize) {
        let plan = match self.controller.plan(depth) {
            Ok(plan) => plan,
            Err(e) => return self.reject(depth, &e),
        };
        debug!(?plan, depth, "Changing depth");

        self.tracker.start_phase_one(plan.fetch_iterations());
        self.progress.send_replace(self.tracker.current_percent());

        let mut reporter = Reporter {
            tracker: &mut self.tracker,
            progress: &self.progress,
        };
        let result = while_busy(
            self.controller.set_depth(depth, &mut reporter),
            &mut self.commands,
            &self.events,
            &mut self.shutdown_requested,
        )
        .await;

        match result {
            Ok(_) => self.settle().await,
            Err(e) => self.fail(&e),
        }
    }

    /// Lay out the displayed graph and provide its statistics
    async fn settle(&mut self) {
        let Some(session) = self.controller.session() else {
            return;
        };
        let depth = session.depth();
        let session_id = session.id();
        let payload = GraphPayload::build(session.root(), depth, session.current(), session.graph().depth_index());
        let quality = Quality::for_node_count(payload.node_count(), self.settings.low_quality_threshold);

        match self.stats_cache.get(&depth) {
            Some(stats) => {
                debug!(depth, "Statistics served from cache");
                self.emit(ExplorerEvent::Statistics {
                    depth,
                    stats: *stats,
                    cached: true,
                });
            }
            None => {
                self.stats.restart(depth, session.current().clone());
            }
        }

        let mut layout_rx = spawn_layout(Arc::clone(&self.layout), LayoutInput::from(&payload), quality);
        let layout = loop {
            tokio::select! {
                message = layout_rx.recv() => match message {
                    Some(LayoutMessage::Tick { fraction }) => {
                        self.tracker.on_layout_progress(fraction);
                        self.progress.send_replace(self.tracker.current_percent());
                    }
                    Some(LayoutMessage::End { layout }) => break Some(layout),
                    None => break None,
                },
                Some(command) = self.commands.recv() => {
                    reject_busy(command, &self.events, &mut self.shutdown_requested);
                }
                Some(message) = self.stats_rx.recv() => self.on_stats(message),
            }
        };

        if let Err(e) = self.controller.finish_settling() {
            warn!(error = %e, "Settle finished in unexpected state");
        }

        match layout {
            Some(layout) => {
                info!(%session_id, depth, nodes = payload.node_count(), links = payload.link_count(), ?quality, "Graph rendered");
                self.emit(ExplorerEvent::Rendered(Rendering {
                    depth,
                    quality,
                    payload,
                    layout,
                }));
            }
            None => self.fail(&AppError::WorkerStopped {
                worker: "layout".to_string(),
            }),
        }
    }

    fn on_stats(&mut self, message: StatsMessage) {
        if !self.stats.accept(&message) {
            debug!("Dropping stale statistics");
            return;
        }
        let StatsMessage::End { depth, stats, .. } = message;
        self.stats_cache.insert(depth, stats);
        self.emit(ExplorerEvent::Statistics {
            depth,
            stats,
            cached: false,
        });
    }

    fn reject(&self, depth: usize, e: &AppError) {
        warn!(depth, error = %e, "Depth request rejected");
        self.emit(ExplorerEvent::Rejected {
            depth,
            reason: e.to_string(),
        });
    }

    fn fail(&self, e: &AppError) {
        error!(error = %e, code = e.code().as_code(), "Operation failed");
        self.emit(ExplorerEvent::Failed { message: e.to_string() });
    }

    fn emit(&self, event: ExplorerEvent) {
        // Nobody listening once the handle is gone
        let _ = self.events.send(event);
    }
}

/// Drive `operation` to completion, turning away commands meanwhile
async fn while_busy<F: Future>(
    operation: F,
    commands: &mut mpsc::Receiver<Command>,
    events: &mpsc::UnboundedSender<ExplorerEvent>,
    shutdown_requested: &mut bool,
) -> F::Output {
    tokio::pin!(operation);
    loop {
        tokio::select! {
            output = &mut operation => return output,
            Some(command) = commands.recv() => reject_busy(command, events, shutdown_requested),
        }
    }
}

fn reject_busy(command: Command, events: &mpsc::UnboundedSender<ExplorerEvent>, shutdown_requested: &mut bool) {
    match command {
        Command::SetDepth(depth) => {
            warn!(depth, "Depth request rejected while an operation is in flight");
            let _ = events.send(ExplorerEvent::Rejected {
                depth,
                reason: "operation in flight".to_string(),
            });
        }
        Command::Shutdown => *shutdown_requested = true,
    }
}
