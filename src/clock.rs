//! Clock abstraction
//!
//! The scheduler never calls `Instant::now()` directly; it goes through
//! a [`Clock`] so tests can substitute their own time source for due-time
//! arithmetic.

use std::time::Instant;

/// Source of the current instant, monotonic for comparison purposes
pub trait Clock: Send + Sync + 'static {
    /// Get the current instant
    fn now(&self) -> Instant;
}

/// Default clock backed by the OS monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
