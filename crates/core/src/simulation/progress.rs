//! Progress reporting for long passes

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

/// Which pipeline a progress update belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Field,
    Isopleths,
}

/// Snapshot of a running pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub kind: PassKind,
    pub completed_sources: usize,
    pub total_sources: usize,
}

impl Progress {
    /// Completion in whole percent, rounded down; an empty pass is complete
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total_sources == 0 {
            return 100;
        }
        (self.completed_sources * 100 / self.total_sources).min(100) as u8
    }
}

/// Receives progress updates on the thread running the pass
pub trait ProgressSink {
    fn report(&self, progress: Progress);
}

impl<F: Fn(Progress)> ProgressSink for F {
    fn report(&self, progress: Progress) {
        self(progress);
    }
}

/// Forwards to another thread; a dropped receiver is ignored
impl ProgressSink for Sender<Progress> {
    fn report(&self, progress: Progress) {
        let _ = self.send(progress);
    }
}

/// Discards all updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: Progress) {}
}
