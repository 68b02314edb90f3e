//! Progress reporting and cancellation for long running algorithms.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Channel between an algorithm and whoever drives it.
///
/// Every method has a no-op default so callers only override what they show.
pub trait Feedback {
    /// Percentage of completion, 0 to 100
    fn set_progress(&self, _percent: u32) {}

    /// Polled between units of work; `true` stops the algorithm early
    fn is_canceled(&self) -> bool {
        false
    }

    /// Informational message for the user
    fn push_info(&self, message: &str) {
        info!("{}", message);
    }
}

/// Feedback that forwards to `tracing` and can be cancelled from another thread.
#[derive(Debug, Default)]
pub struct LogFeedback {
    canceled: AtomicBool,
}

impl LogFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; honoured at the next poll
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }
}

impl Feedback for LogFeedback {
    fn set_progress(&self, percent: u32) {
        debug!("progress {}%", percent);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel() {
        let fb = LogFeedback::new();
        assert!(!fb.is_canceled());
        fb.cancel();
        assert!(fb.is_canceled());
    }
}
