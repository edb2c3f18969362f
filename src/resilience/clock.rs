//! Time source for breaker decisions.
//!
//! # Design Decisions
//! - Breakers never call `Instant::now()` directly; they ask a `Clock`
//! - Milliseconds everywhere, matching `reset_timeout_ms` and `next_retry_time_ms`
//! - `SystemClock` is monotonic but aligned to the Unix epoch when created,
//!   so reported timestamps can be compared against wall time

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds.
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds. Must never go backwards.
    fn now_ms(&self) -> u64;
}

/// Monotonic clock anchored to the wall time at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    anchor: Instant,
    anchor_epoch_ms: u64,
}

impl SystemClock {
    pub fn new() -> Self {
        let anchor_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            anchor: Instant::now(),
            anchor_epoch_ms,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.anchor_epoch_ms + self.anchor.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock, used to drive cool-downs deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time. Ignored if it would move the clock backwards.
    pub fn set(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_epoch_aligned_and_monotonic() {
        let clock = SystemClock::new();
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        // Within a second of wall time.
        assert!(a.abs_diff(wall) < 1000);
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1_500);

        clock.set(1_200);
        assert_eq!(clock.now_ms(), 1_500);

        clock.set(9_000);
        assert_eq!(clock.now_ms(), 9_000);
    }
}
