//! # Poll pacing for readiness detection.
//!
//! [`PollPolicy`] decides how long the detector sleeps before each pass over the
//! bundle: a fixed tick of [`PollPolicy::interval`], the first pass included.
//! Ticks shorter than 1ms are raised to 1ms so a zero interval cannot spin.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use buildvisor::PollPolicy;
//!
//! assert_eq!(PollPolicy::default().delay(), Duration::from_millis(100));
//! assert_eq!(PollPolicy::fixed(Duration::ZERO).delay(), Duration::from_millis(1));
//! ```

use std::time::Duration;

/// Shortest tick the detector sleeps between passes.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Readiness poll pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before every pass.
    pub interval: Duration,
}

impl Default for PollPolicy {
    /// Returns a fixed 100ms tick.
    fn default() -> Self {
        Self::fixed(Duration::from_millis(100))
    }
}

impl PollPolicy {
    /// Fixed tick of `interval`.
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// Delay before the next pass.
    #[inline]
    pub fn delay(&self) -> Duration {
        self.interval.max(MIN_TICK)
    }
}
