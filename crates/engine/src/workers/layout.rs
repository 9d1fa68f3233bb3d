//! Layout worker: runs the simulation on the blocking pool

use crate::layout::{Layout, LayoutEngine, LayoutInput, Quality};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Message from the layout worker
#[derive(Debug)]
pub enum LayoutMessage {
    /// `fraction` of the simulation steps are done
    Tick { fraction: f64 },

    /// Settled positions; always the last message
    End { layout: Layout },
}

/// Simulate `input` on a blocking task
pub fn spawn_layout(
    engine: Arc<dyn LayoutEngine>,
    input: LayoutInput,
    quality: Quality,
) -> mpsc::UnboundedReceiver<LayoutMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let layout = engine.simulate(&input, quality, &mut |fraction| {
            let _ = tx.send(LayoutMessage::Tick { fraction });
        });
        citedin_common::metrics::record_settle("layout", start.elapsed().as_secs_f64());
        let _ = tx.send(LayoutMessage::End { layout });
    });
    rx
}
