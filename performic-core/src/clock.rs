//! Run Clock
//!
//! Monotonic elapsed-time source shared by the sampler and the orchestrator.
//! Built on `std::time::Instant`, so successive readings never go backwards.

use std::time::{Duration, Instant};

/// Monotonic clock anchored at the start of a run
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    origin: Instant,
}

impl RunClock {
    /// Start a clock at the current instant
    #[inline]
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Time elapsed since the clock started
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Whole milliseconds elapsed since the clock started
    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
