//! Per-request cancellation flag.
//!
//! The dispatcher hands one [`CancellationToken`] to every request. The
//! caller thread that runs `stop()` is the only writer; the worker thread
//! reads it at each pipeline checkpoint without taking any lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, monotonic cancellation flag.
///
/// Clones share the same flag. Once [`cancel`](Self::cancel) has been called
/// the token stays cancelled for the rest of its life.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token (initially not cancelled).
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent; safe to call from any thread.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::trace!("Cancellation token set");
        }
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
