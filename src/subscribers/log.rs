//! # LogWriter: session log through `tracing`
//!
//! Prints the watch session in a human-readable form.
//!
//! ## Example output
//! ```text
//! INFO buildvisor: files start out_dir="dist"
//! INFO buildvisor: files ready duration_ms=152
//! ERROR buildvisor: error from file writer: Unexpected token (3:7)
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};

use crate::events::{Event, Lifecycle};
use crate::readiness::Ready;
use crate::subscribers::Subscribe;

/// Session log subscriber.
#[derive(Default)]
pub struct LogWriter {
    root: Option<PathBuf>,
}

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Output directories are printed relative to `root`.
    #[must_use]
    pub fn relative_to(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn display_dir<'a>(&self, dir: &'a Path) -> &'a Path {
        match &self.root {
            Some(root) => dir.strip_prefix(root).unwrap_or(dir),
            None => dir,
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match &e.lifecycle {
            Lifecycle::BuildStart(start) => match &start.options.out_dir {
                Some(dir) => info!(out_dir = %self.display_dir(dir).display(), "files start"),
                None => info!("files start"),
            },
            Lifecycle::Error(failure) => {
                error!("error from file writer:");
                if let Some(detail) = &failure.error {
                    let message = detail.stack.as_deref().unwrap_or(&detail.message);
                    error!(code = ?failure.code, "{message}");
                }
                if let Some(frame) = &failure.frame {
                    error!("{frame}");
                }
            }
            Lifecycle::Init | Lifecycle::WriteBundle(_) | Lifecycle::Change(_) => {}
        }
    }

    async fn on_ready(&self, ready: &Ready) {
        info!(duration_ms = ready.duration(), "files ready");
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
