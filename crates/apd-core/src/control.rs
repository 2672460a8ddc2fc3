//! Run cancellation: a shared token observed by the scheduler and transport.
//!
//! The orchestrator hands one token to a batch. Cancelling it stops queued
//! resources from starting and aborts in-flight transfers at the next chunk
//! boundary; the streaming writer's atomic-commit discipline guarantees a
//! cancelled fetch leaves no partial output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag shared across workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of all queued and in-flight fetches.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
