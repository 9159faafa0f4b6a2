use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{LinchpinError, Result};

/// cooperative cancellation, checked once per feature. clones share the flag
/// and the checkpoint count, so a watcher thread can see how far a run got.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    checkpoints: Arc<AtomicUsize>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// checks made so far, passed or not
    pub fn checkpoints(&self) -> usize {
        self.checkpoints.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        self.checkpoints.fetch_add(1, Ordering::Relaxed);
        if self.is_cancelled() {
            Err(LinchpinError::Cancelled)
        } else {
            Ok(())
        }
    }
}
