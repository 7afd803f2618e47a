use std::sync::atomic::{AtomicBool, Ordering};

/// Single-fire guard for the teardown transition.
///
/// The stop call can be reached from the normal completion path, an error
/// return, and the interrupt path; whichever arrives first wins the
/// compare-and-swap and the others become no-ops.
#[derive(Debug, Default)]
pub struct StopGuard {
    stopped: AtomicBool,
}

impl StopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. Returns `true` for exactly one caller.
    pub fn arm(&self) -> bool {
        self.stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
