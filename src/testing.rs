//! Shared test doubles: probes, a recording host and a simulated watch-mode host.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::core::{WatchContext, WatchFiles};
use crate::events::{
    BuildFailure, BuildOptions, Bundle, Event, EventKind, OutputArtifact, OutputOptions,
};
use crate::readiness::{Probe, Ready};
use crate::subscribers::Subscribe;

pub(crate) fn bundle_of(files: &[&str]) -> Bundle {
    files
        .iter()
        .map(|f| (f.to_string(), OutputArtifact::chunk(*f)))
        .collect()
}

/// Every artifact looks freshly written.
pub(crate) struct FreshProbe;

#[async_trait]
impl Probe for FreshProbe {
    async fn modified(&self, _path: &Path) -> io::Result<SystemTime> {
        Ok(SystemTime::now() + Duration::from_secs(3600))
    }
}

/// Artifacts look stale until the gate is opened.
#[derive(Default)]
pub(crate) struct GateProbe {
    open: AtomicBool,
}

impl GateProbe {
    pub(crate) fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Probe for GateProbe {
    async fn modified(&self, _path: &Path) -> io::Result<SystemTime> {
        if self.open.load(Ordering::SeqCst) {
            Ok(SystemTime::now() + Duration::from_secs(3600))
        } else {
            Ok(SystemTime::UNIX_EPOCH)
        }
    }
}

/// Host double remembering registered watch files.
#[derive(Default)]
pub(crate) struct RecordingHost {
    files: Mutex<Vec<PathBuf>>,
}

impl RecordingHost {
    pub(crate) fn files(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().clone()
    }
}

impl WatchFiles for RecordingHost {
    fn add_watch_file(&self, path: &Path) {
        self.files.lock().unwrap().push(path.to_path_buf());
    }
}

/// Subscriber recording what it was fed.
#[derive(Default)]
pub(crate) struct Collector {
    kinds: Mutex<Vec<EventKind>>,
    ready: Mutex<Vec<u64>>,
}

impl Collector {
    pub(crate) fn kinds(&self) -> Vec<EventKind> {
        self.kinds.lock().unwrap().clone()
    }

    pub(crate) fn ready_seqs(&self) -> Vec<u64> {
        self.ready.lock().unwrap().clone()
    }
}

#[async_trait]
impl Subscribe for Collector {
    async fn on_event(&self, ev: &Event) {
        self.kinds.lock().unwrap().push(ev.kind());
    }

    async fn on_ready(&self, ready: &Ready) {
        self.ready.lock().unwrap().push(ready.seq);
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Runs one successful build cycle through the adapter.
pub(crate) async fn run_cycle(ctx: &WatchContext, out: &Path) -> Arc<Event> {
    let adapter = ctx.adapter();
    adapter
        .build_start(
            &RecordingHost::default(),
            BuildOptions {
                out_dir: Some(out.to_path_buf()),
                ..BuildOptions::default()
            },
        )
        .await
        .unwrap();
    adapter
        .write_bundle(OutputOptions::new(out), bundle_of(&["a.js"]))
        .unwrap()
}

/// How the simulated host reacts to a trigger change.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostMode {
    Succeed,
    Fail,
}

/// Simulated watch-mode host: polls the trigger file and runs a build cycle
/// whenever its content changes.
pub(crate) struct SimHost {
    builds: Arc<AtomicUsize>,
    early_triggers: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl SimHost {
    /// The baseline trigger content is read before returning.
    pub(crate) fn spawn(ctx: Arc<WatchContext>, out: PathBuf, mode: HostMode) -> Self {
        let builds = Arc::new(AtomicUsize::new(0));
        let early_triggers = Arc::new(AtomicUsize::new(0));
        let trigger = ctx.trigger_path().to_path_buf();
        let mut last = std::fs::read_to_string(&trigger).ok();

        let handle = tokio::spawn({
            let builds = Arc::clone(&builds);
            let early = Arc::clone(&early_triggers);
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    let content = tokio::fs::read_to_string(&trigger).await.ok();
                    if content == last {
                        continue;
                    }
                    last = content;
                    if !ctx.readiness().is_ready() {
                        early.fetch_add(1, Ordering::SeqCst);
                    }
                    builds.fetch_add(1, Ordering::SeqCst);
                    match mode {
                        HostMode::Succeed => {
                            run_cycle(&ctx, &out).await;
                        }
                        HostMode::Fail => {
                            ctx.adapter()
                                .build_start(&RecordingHost::default(), BuildOptions::default())
                                .await
                                .unwrap();
                            ctx.adapter()
                                .render_error(BuildFailure::message("transform failed"));
                        }
                    }
                }
            }
        });

        Self {
            builds,
            early_triggers,
            handle,
        }
    }

    pub(crate) fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Trigger writes observed while the previous cycle was not on disk yet.
    pub(crate) fn early_triggers(&self) -> usize {
        self.early_triggers.load(Ordering::SeqCst)
    }
}

impl Drop for SimHost {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
