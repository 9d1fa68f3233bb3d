//! Two-phase progress tracking
//!
//! An operation has a fetch phase (a known number of sequential batches,
//! each of which may report partial progress) and a layout phase. Each
//! phase is worth half of the bar.

use serde::Serialize;

/// Receives fetch-phase progress from the depth controller
pub trait FetchObserver: Send {
    /// Partial progress of the batch currently in flight
    fn on_batch_progress(&mut self, fraction: f64);

    /// The batch in flight finished and was merged
    fn on_batch_complete(&mut self);
}

/// Observer that ignores everything
impl FetchObserver for () {
    fn on_batch_progress(&mut self, _fraction: f64) {}
    fn on_batch_complete(&mut self) {}
}

/// Progress counters of one operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProgressTracker {
    total_batches: usize,
    completed_batches: usize,
    batch_fraction: f64,
    layout_fraction: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for an operation expecting `total_batches` fetch iterations.
    ///
    /// The count covers the current operation only, not the whole session.
    pub fn start_phase_one(&mut self, total_batches: usize) {
        *self = Self {
            total_batches,
            ..Self::default()
        };
    }

    pub fn on_batch_progress(&mut self, fraction: f64) {
        // Partial progress never moves the bar backwards within a batch
        self.batch_fraction = self.batch_fraction.max(clamp_unit(fraction));
    }

    pub fn on_batch_complete(&mut self) {
        self.completed_batches = (self.completed_batches + 1).min(self.total_batches);
        self.batch_fraction = 0.0;
    }

    pub fn on_layout_progress(&mut self, fraction: f64) {
        self.layout_fraction = self.layout_fraction.max(clamp_unit(fraction));
    }

    /// Fraction of the fetch phase done, counting partial batch progress
    pub fn fetch_fraction(&self) -> f64 {
        if self.total_batches == 0 {
            return 1.0;
        }
        let done = self.completed_batches as f64 + self.batch_fraction;
        (done / self.total_batches as f64).min(1.0)
    }

    pub fn layout_fraction(&self) -> f64 {
        self.layout_fraction
    }

    pub fn total_batches(&self) -> usize {
        self.total_batches
    }

    pub fn completed_batches(&self) -> usize {
        self.completed_batches
    }

    /// Overall percentage, rounded to two decimals and capped at 100
    pub fn current_percent(&self) -> f64 {
        let percent = 50.0 * (self.fetch_fraction() + self.layout_fraction);
        round2(percent.min(100.0))
    }
}

impl FetchObserver for ProgressTracker {
    fn on_batch_progress(&mut self, fraction: f64) {
        ProgressTracker::on_batch_progress(self, fraction);
    }

    fn on_batch_complete(&mut self) {
        ProgressTracker::on_batch_complete(self);
    }
}

fn clamp_unit(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
