//! Progress reporting for a document run (units done, rate, ETA).
//!
//! Sent to the CLI over a tokio mpsc channel with `try_send`; a full channel
//! drops the update rather than blocking a worker.

use std::time::Instant;

use tokio::sync::mpsc::Sender;

/// Snapshot of progress for one document (CLI-friendly).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Document file name.
    pub document: String,
    /// Units with audio on disk (including ones resumed from a checkpoint).
    pub units_done: usize,
    /// Units that failed in this run.
    pub units_failed: usize,
    /// Total units in the document.
    pub unit_count: usize,
    /// Units completed during this run (excludes resumed ones).
    pub done_this_run: usize,
    /// Elapsed time since dispatch started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.unit_count == 0 {
            return 1.0;
        }
        (self.units_done as f64 / self.unit_count as f64).min(1.0)
    }

    /// Units per minute in this run (0 if nothing finished yet).
    pub fn units_per_min(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.done_this_run as f64 * 60.0 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if the rate is unknown).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self
            .unit_count
            .saturating_sub(self.units_done + self.units_failed);
        if remaining == 0 {
            return Some(0.0);
        }
        let per_min = self.units_per_min();
        if per_min <= 0.0 {
            return None;
        }
        Some(remaining as f64 * 60.0 / per_min)
    }
}

/// Builds and sends [`ProgressStats`] for one document.
pub(super) struct ProgressReporter<'a> {
    tx: Option<&'a Sender<ProgressStats>>,
    document: String,
    unit_count: usize,
    resumed: usize,
    started: Instant,
}

impl<'a> ProgressReporter<'a> {
    pub(super) fn new(
        tx: Option<&'a Sender<ProgressStats>>,
        document: String,
        unit_count: usize,
        resumed: usize,
    ) -> Self {
        Self {
            tx,
            document,
            unit_count,
            resumed,
            started: Instant::now(),
        }
    }

    pub(super) fn report(&self, units_done: usize, units_failed: usize) {
        let Some(tx) = self.tx else {
            return;
        };
        let _ = tx.try_send(ProgressStats {
            document: self.document.clone(),
            units_done,
            units_failed,
            unit_count: self.unit_count,
            done_this_run: units_done.saturating_sub(self.resumed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        });
    }
}
