//! # Artifact probe: where modification times come from.
//!
//! [`Probe`] is the seam between the readiness detector and the filesystem.
//! [`FsProbe`] stats the real filesystem through `tokio::fs`; tests plug in
//! scripted probes.
//!
//! ## Rules
//! - Any `Err` (typically `NotFound` while the host is still flushing) means
//!   "not ready yet"; the detector never surfaces it.
//! - Returned times must be comparable with the `WriteBundle` watermark
//!   (wall-clock [`SystemTime`]).

use std::io;
use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;

/// Source of artifact modification times.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Returns the modification time of `path`.
    async fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Returns the probe name used in traces.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Filesystem probe (`stat` via [`tokio::fs::metadata`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

#[async_trait]
impl Probe for FsProbe {
    async fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        tokio::fs::metadata(path).await?.modified()
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use filetime::FileTime;

    #[tokio::test]
    async fn test_fs_probe_reads_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.js");
        std::fs::write(&file, "export {}").unwrap();

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        filetime::set_file_mtime(&file, FileTime::from_system_time(at)).unwrap();

        let got = FsProbe.modified(&file).await.unwrap();
        assert_eq!(got, at);
    }

    #[tokio::test]
    async fn test_fs_probe_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsProbe
            .modified(&dir.path().join("missing.js"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
