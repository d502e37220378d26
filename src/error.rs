//! Error types used by the coordination layer.
//!
//! Build failures reported by the host are **not** errors here: they travel as
//! [`Lifecycle::Error`](crate::Lifecycle::Error) events. [`WatchError`] covers the
//! failures of the coordination layer itself.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the coordination layer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WatchError {
    /// The trigger file could not be created or overwritten.
    #[error("trigger file {path:?}: {source}")]
    Trigger {
        /// Location of the trigger file.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A bounded wait elapsed (only when `Config::ready_timeout` is non-zero).
    #[error("no {waiting_for} within {timeout:?}")]
    Timeout {
        /// What was being awaited (`"readiness"`, `"build start"`).
        waiting_for: &'static str,
        /// The configured bound.
        timeout: Duration,
    },

    /// The event source went away while waiting.
    #[error("event source closed")]
    Closed,
}

impl WatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use buildvisor::WatchError;
    /// use std::time::Duration;
    ///
    /// let err = WatchError::Timeout { waiting_for: "readiness", timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "watch_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WatchError::Trigger { .. } => "watch_trigger_io",
            WatchError::Timeout { .. } => "watch_timeout",
            WatchError::Closed => "watch_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WatchError::Trigger { path, source } => {
                format!("trigger {}: {source}", path.display())
            }
            WatchError::Timeout {
                waiting_for,
                timeout,
            } => format!("stalled waiting for {waiting_for} after {timeout:?}"),
            WatchError::Closed => "event source closed".to_string(),
        }
    }
}

/// Awaits `fut`, failing with [`WatchError::Timeout`] once `limit` elapses.
///
/// `None` waits forever.
pub(crate) async fn bounded<T, F>(
    limit: Option<Duration>,
    waiting_for: &'static str,
    fut: F,
) -> Result<T, WatchError>
where
    F: Future<Output = Result<T, WatchError>>,
{
    match limit {
        None => fut.await,
        Some(timeout) => tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_elapsed| WatchError::Timeout {
                waiting_for,
                timeout,
            })?,
    }
}
