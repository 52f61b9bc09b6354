//! Cooperative cancellation.
//!
//! A signal handler only flips the token; the control loop polls it between
//! blocking slices and runs its own shutdown sequence.

use core::sync::atomic::{AtomicBool, Ordering};

/// Shared stop request flag.
#[derive(Debug, Default)]
pub struct StopToken {
    stop: AtomicBool,
}

impl StopToken {
    pub const fn new() -> Self {
        StopToken {
            stop: AtomicBool::new(false),
        }
    }

    /// Ask the loop to stop. Never blocks; safe from a signal handler thread.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
