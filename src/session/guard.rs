//! Session state and the single-capture guard.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle of a camera session as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No usable camera handle.
    Closed,
    /// Camera acquired, waiting for the output surface.
    Opened,
    /// Preview running, ready to capture.
    Previewing,
    /// A still capture is in flight.
    Capturing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Closed => "closed",
            SessionState::Opened => "opened",
            SessionState::Previewing => "previewing",
            SessionState::Capturing => "capturing",
        };
        f.write_str(name)
    }
}

/// Enforces at most one still capture in flight.
///
/// "Armed" means no capture is in flight and a new one may begin. Taking
/// the guard is a single compare-and-swap, so two racing callers can never
/// both win.
#[derive(Debug, Default)]
pub struct CaptureGuard {
    armed: AtomicBool,
}

impl CaptureGuard {
    /// Creates a disarmed guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically moves armed -> disarmed. Returns true for the caller
    /// that made the transition.
    pub fn try_begin(&self) -> bool {
        self.armed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Allows the next capture.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Blocks captures until re-armed.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    /// Advisory snapshot; use [`Self::try_begin`] to actually claim.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_disarmed() {
        let guard = CaptureGuard::new();
        assert!(!guard.is_armed());
        assert!(!guard.try_begin());
    }

    #[test]
    fn test_single_winner() {
        let guard = Arc::new(CaptureGuard::new());
        guard.arm();

        let winners = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if guard.try_begin() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!guard.is_armed());
    }
}
