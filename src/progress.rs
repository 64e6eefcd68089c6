//! Progress reporting for multi-track operations.
//!
//! Batch operations (filtering, POI search, routing, export) walk tracks one at
//! a time and report through a [`ProgressReporter`] supplied by the caller.
//! The geometric core never touches progress state.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Snapshot of a batch operation's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressStatus {
    pub current: u32,
    pub total: u32,
    pub in_progress: bool,
}

/// Receiver of progress updates.
///
/// With the `parallel` feature updates can arrive from rayon worker threads,
/// so implementations must be `Send + Sync`.
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first track with the number of tracks to process.
    fn on_start(&self, total: u32);
    /// Called after each track; `current` counts completed tracks.
    fn on_advance(&self, current: u32, total: u32);
    /// Called once when the batch is done, successful or not.
    fn on_finish(&self);
}

/// Reporter that ignores every update.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn on_start(&self, _total: u32) {}
    fn on_advance(&self, _current: u32, _total: u32) {}
    fn on_finish(&self) {}
}

/// Reporter that can be polled from another thread.
#[derive(Debug, Default)]
pub struct AtomicProgress {
    current: AtomicU32,
    total: AtomicU32,
    in_progress: AtomicBool,
}

impl AtomicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ProgressStatus {
        ProgressStatus {
            current: self.current.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
            in_progress: self.in_progress.load(Ordering::SeqCst),
        }
    }
}

impl ProgressReporter for AtomicProgress {
    fn on_start(&self, total: u32) {
        self.current.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        self.in_progress.store(true, Ordering::SeqCst);
    }

    fn on_advance(&self, current: u32, _total: u32) {
        // Parallel workers may finish out of order
        self.current.fetch_max(current, Ordering::SeqCst);
    }

    fn on_finish(&self) {
        self.in_progress.store(false, Ordering::SeqCst);
    }
}
