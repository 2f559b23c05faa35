//! Progress reporting seam.
//!
//! The scheduler reports through [`Progress`] so the library stays usable without a
//! terminal. `indicatif::ProgressBar` implements it directly.

use indicatif::ProgressBar;

pub trait Progress: Sync {
    /// Starts a new phase of `total` steps
    fn start(&self, label: &str, total: u64);
    /// One step finished; may be called from any worker
    fn advance(&self);
    fn finish(&self);
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _label: &str, _total: u64) {}
    fn advance(&self) {}
    fn finish(&self) {}
}

impl Progress for ProgressBar {
    fn start(&self, label: &str, total: u64) {
        self.reset();
        self.set_length(total);
        self.set_message(label.to_string());
    }

    fn advance(&self) {
        self.inc(1);
    }

    fn finish(&self) {
        self.finish_and_clear();
    }
}
