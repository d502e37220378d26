//! # Coordination configuration.
//!
//! Provides [`Config`] centralized settings for a [`WatchContext`](crate::WatchContext).
//!
//! ## Sentinel values
//! - `ready_timeout = 0s` → wait forever (no bound on readiness / build-start waits)
//! - `bus_capacity = 0` → clamped to 1

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::PollPolicy;

/// Default file name of the rebuild trigger inside the cache directory.
pub const DEFAULT_TRIGGER_NAME: &str = ".crx-watch-trigger";

/// Settings for the coordination layer.
///
/// ## Field semantics
/// - `cache_dir`: directory holding the trigger file (created on demand)
/// - `trigger_name`: trigger file name inside `cache_dir`
/// - `poll`: pacing of readiness passes
/// - `ready_timeout`: bound on every coordinator wait (`0s` = unbounded)
/// - `bus_capacity`: event ring size shared by all receivers
#[derive(Clone, Debug)]
pub struct Config {
    /// Build cache directory of the host.
    pub cache_dir: PathBuf,

    /// Trigger file name, joined onto `cache_dir`.
    pub trigger_name: String,

    /// Readiness poll pacing.
    pub poll: PollPolicy,

    /// Upper bound for readiness and build-start waits.
    ///
    /// - `Duration::ZERO` = unbounded; a stalled host keeps callers suspended
    /// - `> 0` = waits fail with `WatchError::Timeout`
    pub ready_timeout: Duration,

    /// Capacity of the event bus ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip the oldest.
    pub bus_capacity: usize,
}

impl Config {
    /// Creates a default configuration rooted at the given cache directory.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Full path of the trigger file.
    #[inline]
    pub fn trigger_path(&self) -> PathBuf {
        self.cache_dir.join(&self.trigger_name)
    }

    /// Returns the wait bound as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(d)` → waits fail after `d`
    #[inline]
    pub fn ready_deadline(&self) -> Option<Duration> {
        if self.ready_timeout == Duration::ZERO {
            None
        } else {
            Some(self.ready_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `cache_dir = node_modules/.vite`
    /// - `trigger_name = .crx-watch-trigger`
    /// - `poll = PollPolicy::default()` (fixed 100ms)
    /// - `ready_timeout = 0s` (unbounded)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("node_modules/.vite"),
            trigger_name: DEFAULT_TRIGGER_NAME.to_string(),
            poll: PollPolicy::default(),
            ready_timeout: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
