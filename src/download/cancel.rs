//! Cooperative cancellation for a download session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-way cancellation flag shared between a session handle and its tasks.
///
/// Once set it stays set. Fetchers poll it between chunks; nothing is
/// interrupted preemptively.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Creates an unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Stop conditions a fetcher observes at every chunk boundary.
///
/// `user` is the caller's cancellation; `abort` is raised by the controller
/// when a sibling segment failed. Keeping them apart lets the controller
/// report `Cancelled` and `Failed` distinctly.
#[derive(Debug, Clone, Default)]
pub(crate) struct StopSignals {
    pub(crate) user: CancelSignal,
    pub(crate) abort: CancelSignal,
}

impl StopSignals {
    pub(crate) fn new(user: CancelSignal) -> Self {
        Self {
            user,
            abort: CancelSignal::new(),
        }
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.user.is_cancelled() || self.abort.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_one_way_and_shared() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());

        signal.cancel();
        signal.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_stop_signals_observe_either_flag() {
        let stop = StopSignals::new(CancelSignal::new());
        assert!(!stop.should_stop());
        stop.abort.cancel();
        assert!(stop.should_stop());
        assert!(!stop.user.is_cancelled());

        let stop = StopSignals::new(CancelSignal::new());
        stop.user.cancel();
        assert!(stop.should_stop());
    }
}
