//! # Lifecycle events emitted by the watch-mode build.
//!
//! The [`Lifecycle`] enum is the payload of every event: exactly one variant is
//! active at a time and the bus always holds the most recent one.
//!
//! - **Init**: sentinel value held by the bus before anything was published;
//! - **BuildStart**: the host began a build cycle;
//! - **WriteBundle**: the host finished writing the output bundle;
//! - **Error**: a build or render failure reported by the host;
//! - **Change**: a watched path changed on disk.
//!
//! [`Event`] wraps the payload with the stamp assigned by the [`Bus`](super::Bus)
//! at publish time.
//!
//! ## Ordering guarantees
//! `seq` is assigned under the bus publish lock, so it strictly increases in
//! emission order. `Init` always carries `seq = 0`.
//!
//! ## Example
//! ```rust
//! use buildvisor::{ChangeKind, EventKind, Lifecycle};
//!
//! let change = Lifecycle::change("src/main.ts", ChangeKind::Updated);
//! assert_eq!(change.kind(), EventKind::Change);
//! assert_eq!(Lifecycle::Init.kind(), EventKind::Init);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// Output bundle: relative output path → produced artifact metadata.
pub type Bundle = BTreeMap<String, OutputArtifact>;

/// Classification of lifecycle events, used to filter event streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Init,
    BuildStart,
    WriteBundle,
    Error,
    Change,
}

/// Kind of change reported for a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Short lowercase label (`created`, `updated`, `deleted`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

/// Description of the pending build configuration, as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Entry points of the build.
    pub input: Vec<PathBuf>,
    /// Project root, if the host knows it.
    pub root: Option<PathBuf>,
    /// Output directory the build is going to write into.
    pub out_dir: Option<PathBuf>,
}

/// Output options of a completed write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Directory every bundle path is relative to.
    pub dir: PathBuf,
    /// Output module format (`es`, `iife`, ...), if the host reports it.
    pub format: Option<String>,
}

impl OutputOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: None,
        }
    }
}

/// What kind of artifact a bundle entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Chunk,
    Asset,
}

/// Metadata of one produced output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub file_name: String,
    pub kind: ArtifactKind,
    /// Whether the chunk is an entry point (always `false` for assets).
    pub is_entry: bool,
}

impl OutputArtifact {
    pub fn chunk(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: ArtifactKind::Chunk,
            is_entry: false,
        }
    }

    pub fn asset(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: ArtifactKind::Asset,
            is_entry: false,
        }
    }
}

/// Payload of [`Lifecycle::BuildStart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStart {
    pub options: BuildOptions,
}

/// Payload of [`Lifecycle::WriteBundle`].
#[derive(Debug, Clone)]
pub struct WriteBundle {
    pub options: OutputOptions,
    pub bundle: Arc<Bundle>,
    /// Milliseconds elapsed since the paired build start (rounded).
    pub duration: u64,
    /// Instant the host reported the write as complete; readiness watermark.
    pub timestamp: SystemTime,
}

/// Error detail carried by a build failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Payload of [`Lifecycle::Error`]; every field is optional because failure
/// sources differ in the detail they supply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFailure {
    pub error: Option<ErrorDetail>,
    pub code: Option<String>,
    pub frame: Option<String>,
}

impl BuildFailure {
    /// Failure carrying only an error message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorDetail::new(message)),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[inline]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }
}

/// Payload of [`Lifecycle::Change`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub id: PathBuf,
    pub event: ChangeKind,
}

/// One phase transition of a watch-mode build cycle.
#[derive(Debug, Clone)]
pub enum Lifecycle {
    Init,
    BuildStart(BuildStart),
    WriteBundle(Arc<WriteBundle>),
    Error(BuildFailure),
    Change(FileChange),
}

impl Lifecycle {
    pub fn build_start(options: BuildOptions) -> Self {
        Lifecycle::BuildStart(BuildStart { options })
    }

    pub fn change(id: impl Into<PathBuf>, event: ChangeKind) -> Self {
        Lifecycle::Change(FileChange {
            id: id.into(),
            event,
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Lifecycle::Init => EventKind::Init,
            Lifecycle::BuildStart(_) => EventKind::BuildStart,
            Lifecycle::WriteBundle(_) => EventKind::WriteBundle,
            Lifecycle::Error(_) => EventKind::Error,
            Lifecycle::Change(_) => EventKind::Change,
        }
    }
}

/// A published, immutable lifecycle event.
///
/// - `seq`: strictly increasing per bus, in emission order (`Init` = 0)
/// - `at`: wall-clock time of publication
#[derive(Debug, Clone)]
pub struct Event {
    pub seq: u64,
    pub at: SystemTime,
    pub lifecycle: Lifecycle,
}

impl Event {
    pub(crate) fn stamped(seq: u64, lifecycle: Lifecycle) -> Self {
        Self {
            seq,
            at: SystemTime::now(),
            lifecycle,
        }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.lifecycle.kind()
    }

    pub fn as_build_start(&self) -> Option<&BuildStart> {
        match &self.lifecycle {
            Lifecycle::BuildStart(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_write_bundle(&self) -> Option<&Arc<WriteBundle>> {
        match &self.lifecycle {
            Lifecycle::WriteBundle(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&BuildFailure> {
        match &self.lifecycle {
            Lifecycle::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_change(&self) -> Option<&FileChange> {
        match &self.lifecycle {
            Lifecycle::Change(c) => Some(c),
            _ => None,
        }
    }
}
