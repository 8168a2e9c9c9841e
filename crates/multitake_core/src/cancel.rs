//! Cooperative cancellation shared by the scheduler, renderer and pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle for requesting early termination.
///
/// Long-running loops check it at segment or step boundaries and return
/// whatever they have built so far.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
