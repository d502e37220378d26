//! # Rebuild trigger file.
//!
//! A file in the build cache whose only purpose is to produce a change
//! notification: the adapter registers it as a watched input on every build
//! start, so overwriting it makes the host start a new cycle.
//!
//! ## Rules
//! - Created lazily (with a timestamp payload) on build start if absent.
//! - Overwritten, never deleted, on every rebuild request.
//! - Content is an opaque timestamp (milliseconds since the Unix epoch); it is
//!   never read back by the coordination layer.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::WatchError;

/// Handle to the trigger file.
#[derive(Debug, Clone)]
pub struct TriggerFile {
    path: PathBuf,
}

impl TriggerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file if it does not exist yet; never overwrites.
    ///
    /// Returns `true` if the file was created by this call.
    pub async fn ensure(&self) -> Result<bool, WatchError> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        if exists {
            return Ok(false);
        }
        self.write_stamp().await?;
        debug!(path = %self.path.display(), "trigger file created");
        Ok(true)
    }

    /// Overwrites the file with a fresh timestamp.
    pub async fn touch(&self) -> Result<(), WatchError> {
        self.write_stamp().await?;
        debug!(path = %self.path.display(), "trigger file touched");
        Ok(())
    }

    async fn write_stamp(&self) -> Result<(), WatchError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        tokio::fs::write(&self.path, stamp(SystemTime::now()))
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> WatchError {
        WatchError::Trigger {
            path: self.path.clone(),
            source,
        }
    }
}

/// Trigger payload for `at`.
fn stamp(at: SystemTime) -> String {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}
