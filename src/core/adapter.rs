//! # LifecycleAdapter: host hooks → bus publications.
//!
//! The adapter is the boundary the host build tool calls into. Each hook
//! translates one host callback into exactly one [`Bus`] publication; it performs
//! no retries and makes no judgment about build success.
//!
//! ## Hook mapping
//! ```text
//! watcher_start(subs)      ──► open (or resume) the WatchSession, start routing
//! build_start(host, opts)  ──► record start, ensure trigger, host.add_watch_file(trigger)
//!                              ──► publish BuildStart{options}
//! write_bundle(opts, b)    ──► publish WriteBundle{options, bundle, duration, timestamp: now}
//! render_error(failure)    ──► publish Error{error, code, frame}
//! watch_change(id, kind)   ──► publish Change{id, event}
//! close_watcher()          ──► stop routing, stop the WatchSession
//! ```
//!
//! ## Rules
//! - Hooks called while no session is open are ignored (logged at `debug`).
//! - Every publication goes through the readiness hook first, so readiness
//!   state is never behind the event stream.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::time::Instant;
use tracing::debug;

use super::session::WatchSession;
use super::trigger::TriggerFile;
use crate::error::WatchError;
use crate::events::{
    BuildFailure, BuildOptions, Bundle, Bus, ChangeKind, Event, Lifecycle, OutputOptions,
    WriteBundle,
};
use crate::readiness::ReadinessDetector;
use crate::subscribers::Subscribe;

/// Host-side registration of extra watched inputs.
pub trait WatchFiles: Send + Sync {
    /// Adds `path` to the inputs whose changes re-trigger a build.
    fn add_watch_file(&self, path: &Path);
}

impl<F> WatchFiles for F
where
    F: Fn(&Path) + Send + Sync,
{
    fn add_watch_file(&self, path: &Path) {
        self(path)
    }
}

/// Translates host lifecycle hooks into lifecycle events.
pub struct LifecycleAdapter {
    bus: Bus,
    detector: Arc<ReadinessDetector>,
    trigger: TriggerFile,
    started: Mutex<Option<Instant>>,
    routing: AtomicBool,
    session: Mutex<Option<WatchSession>>,
}

impl LifecycleAdapter {
    pub(crate) fn new(bus: Bus, detector: Arc<ReadinessDetector>, trigger: TriggerFile) -> Self {
        Self {
            bus,
            detector,
            trigger,
            started: Mutex::new(None),
            routing: AtomicBool::new(false),
            session: Mutex::new(None),
        }
    }

    /// Watcher started: open a session for `subscribers` and begin routing.
    ///
    /// If a session is already running it is kept as is and `subscribers` is
    /// dropped.
    pub fn watcher_start(&self, subscribers: Vec<Arc<dyn Subscribe>>) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        match session.as_ref() {
            Some(running) if running.is_running() => {
                debug!("watcher start: session resumed");
            }
            _ => {
                *session = WatchSession::start(&self.bus, &self.detector, subscribers);
                debug!(session = session.is_some(), "watcher start");
            }
        }
        self.routing.store(true, Ordering::SeqCst);
    }

    /// Watcher closed: stop routing and tear the session down.
    pub async fn close_watcher(&self) {
        self.routing.store(false, Ordering::SeqCst);
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            session.stop().await;
        }
        debug!("close watcher");
    }

    /// Whether hooks are currently routed to the bus.
    pub fn is_routing(&self) -> bool {
        self.routing.load(Ordering::SeqCst)
    }

    /// Build started.
    ///
    /// Ensures the trigger file exists and is watched by the host, then publishes
    /// `BuildStart`. Fails only if the trigger file cannot be created; the start
    /// is then not recorded and a following `write_bundle` reports no duration.
    pub async fn build_start(
        &self,
        host: &dyn WatchFiles,
        options: BuildOptions,
    ) -> Result<Option<Arc<Event>>, WatchError> {
        if !self.accepts("build_start") {
            return Ok(None);
        }
        let at = Instant::now();
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        self.trigger.ensure().await?;
        host.add_watch_file(self.trigger.path());
        *self.started.lock().unwrap_or_else(PoisonError::into_inner) = Some(at);

        let ev = self.emit(Lifecycle::build_start(options));
        debug!(seq = ev.seq, "buildStart");
        Ok(Some(ev))
    }

    /// Bundle written.
    ///
    /// The watermark is taken now, after the host reported the write complete.
    pub fn write_bundle(&self, options: OutputOptions, bundle: Bundle) -> Option<Arc<Event>> {
        if !self.accepts("write_bundle") {
            return None;
        }
        let timestamp = SystemTime::now();
        let started = *self.started.lock().unwrap_or_else(PoisonError::into_inner);
        let duration = match started {
            Some(at) => round_millis(at.elapsed()),
            None => {
                debug!("writeBundle without a recorded build start");
                0
            }
        };

        let ev = self.emit(Lifecycle::WriteBundle(Arc::new(WriteBundle {
            options,
            bundle: Arc::new(bundle),
            duration,
            timestamp,
        })));
        debug!(seq = ev.seq, duration_ms = duration, "writeBundle");
        Some(ev)
    }

    /// Render or build failure.
    pub fn render_error(&self, failure: BuildFailure) -> Option<Arc<Event>> {
        if !self.accepts("render_error") {
            return None;
        }
        let ev = self.emit(Lifecycle::Error(failure));
        debug!(seq = ev.seq, "renderError");
        Some(ev)
    }

    /// Watched path changed.
    pub fn watch_change(&self, id: impl Into<PathBuf>, event: ChangeKind) -> Option<Arc<Event>> {
        if !self.accepts("watch_change") {
            return None;
        }
        let ev = self.emit(Lifecycle::change(id, event));
        debug!(seq = ev.seq, change = event.as_str(), "watchChange");
        Some(ev)
    }

    fn accepts(&self, hook: &'static str) -> bool {
        let routing = self.is_routing();
        if !routing {
            debug!(hook, "hook ignored outside a watch session");
        }
        routing
    }

    fn emit(&self, lifecycle: Lifecycle) -> Arc<Event> {
        self.bus
            .publish_with(lifecycle, |ev| self.detector.observe(ev))
    }
}

/// Whole milliseconds, rounded half up.
fn round_millis(d: Duration) -> u64 {
    (d.as_secs_f64() * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::events::{EventKind, OutputArtifact};
    use crate::policies::PollPolicy;
    use crate::readiness::Readiness;
    use crate::testing::{Collector, FreshProbe, RecordingHost, bundle_of};

    struct Fixture {
        _dir: tempfile::TempDir,
        bus: Bus,
        detector: Arc<ReadinessDetector>,
        adapter: LifecycleAdapter,
        trigger: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let trigger = dir.path().join("cache/.crx-watch-trigger");
        let bus = Bus::new(64);
        let detector = Arc::new(ReadinessDetector::new(
            Arc::new(FreshProbe),
            PollPolicy::fixed(Duration::from_millis(5)),
            None,
            16,
        ));
        let adapter = LifecycleAdapter::new(
            bus.clone(),
            Arc::clone(&detector),
            TriggerFile::new(&trigger),
        );
        Fixture {
            _dir: dir,
            bus,
            detector,
            adapter,
            trigger,
        }
    }

    #[test]
    fn test_round_millis() {
        assert_eq!(round_millis(Duration::from_micros(1_400)), 1);
        assert_eq!(round_millis(Duration::from_micros(1_500)), 2);
        assert_eq!(round_millis(Duration::from_millis(150)), 150);
        assert_eq!(round_millis(Duration::ZERO), 0);
    }

    #[tokio::test]
    async fn test_build_start_ensures_and_registers_trigger() {
        let fx = fixture();
        let host = RecordingHost::default();
        fx.adapter.watcher_start(Vec::new());

        let options = BuildOptions {
            input: vec![PathBuf::from("src/main.ts")],
            ..BuildOptions::default()
        };
        let ev = fx
            .adapter
            .build_start(&host, options.clone())
            .await
            .unwrap()
            .unwrap();

        assert!(fx.trigger.exists());
        assert_eq!(host.files(), vec![fx.trigger.clone()]);
        assert_eq!(ev.as_build_start().map(|b| &b.options), Some(&options));
        assert_eq!(fx.bus.current().seq, ev.seq);
        assert!(matches!(fx.detector.state(), Readiness::Building { seq } if seq == ev.seq));
    }

    #[tokio::test]
    async fn test_build_start_keeps_existing_trigger() {
        let fx = fixture();
        std::fs::create_dir_all(fx.trigger.parent().unwrap()).unwrap();
        std::fs::write(&fx.trigger, "42").unwrap();
        fx.adapter.watcher_start(Vec::new());

        fx.adapter
            .build_start(&RecordingHost::default(), BuildOptions::default())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&fx.trigger).unwrap(), "42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_bundle_reports_duration_since_start() {
        let fx = fixture();
        fx.adapter.watcher_start(Vec::new());
        fx.adapter
            .build_start(&RecordingHost::default(), BuildOptions::default())
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(150)).await;
        let before = SystemTime::now();
        let ev = fx
            .adapter
            .write_bundle(OutputOptions::new("/out"), bundle_of(&["a.js"]))
            .unwrap();

        let write = ev.as_write_bundle().unwrap();
        assert_eq!(write.duration, 150);
        assert!(write.timestamp >= before);
        assert_eq!(write.bundle.get("a.js"), Some(&OutputArtifact::chunk("a.js")));
        assert!(matches!(fx.detector.state(), Readiness::Polling { seq } if seq == ev.seq));
    }

    #[tokio::test]
    async fn test_error_and_change_are_translated_verbatim() {
        let fx = fixture();
        fx.adapter.watcher_start(Vec::new());

        let failure = BuildFailure::message("Unexpected token")
            .with_code("PARSE_ERROR")
            .with_frame("1 | let = ;");
        let ev = fx.adapter.render_error(failure.clone()).unwrap();
        assert_eq!(ev.as_error(), Some(&failure));

        let ev = fx
            .adapter
            .watch_change("/src/a.ts", ChangeKind::Deleted)
            .unwrap();
        let change = ev.as_change().unwrap();
        assert_eq!(change.id, PathBuf::from("/src/a.ts"));
        assert_eq!(change.event, ChangeKind::Deleted);
        assert!(matches!(fx.detector.state(), Readiness::Idle));
    }

    #[tokio::test]
    async fn test_hooks_outside_session_are_ignored() {
        let fx = fixture();
        assert!(fx.adapter.write_bundle(OutputOptions::default(), Bundle::new()).is_none());
        assert!(
            fx.adapter
                .build_start(&RecordingHost::default(), BuildOptions::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!fx.trigger.exists());
        assert_eq!(fx.bus.current().kind(), EventKind::Init);

        fx.adapter.watcher_start(Vec::new());
        assert!(fx.adapter.watch_change("a.ts", ChangeKind::Created).is_some());
        fx.adapter.close_watcher().await;
        assert!(fx.adapter.render_error(BuildFailure::default()).is_none());
        assert_eq!(fx.bus.current().kind(), EventKind::Change);
    }

    #[tokio::test]
    async fn test_session_feeds_subscribers_until_closed() {
        let fx = fixture();
        let collector = Arc::new(Collector::default());
        fx.adapter.watcher_start(vec![collector.clone()]);

        fx.adapter
            .build_start(&RecordingHost::default(), BuildOptions::default())
            .await
            .unwrap();
        let write = fx
            .adapter
            .write_bundle(OutputOptions::new("/out"), bundle_of(&["a.js"]))
            .unwrap();
        let ready = fx.detector.ready().await.unwrap();
        assert_eq!(ready.seq, write.seq);
        fx.adapter.close_watcher().await;

        assert_eq!(
            collector.kinds(),
            vec![EventKind::BuildStart, EventKind::WriteBundle]
        );
        assert_eq!(collector.ready_seqs(), vec![write.seq]);

        fx.bus.publish(Lifecycle::change("late.ts", ChangeKind::Updated));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(collector.kinds().len(), 2);
    }

    #[tokio::test]
    async fn test_close_delivers_everything_published_before() {
        let fx = fixture();
        let collector = Arc::new(Collector::default());
        fx.adapter.watcher_start(vec![collector.clone()]);

        fx.adapter.render_error(BuildFailure::message("boom"));
        fx.adapter.watch_change("src/a.ts", ChangeKind::Updated);
        fx.adapter.close_watcher().await;

        assert_eq!(collector.kinds(), vec![EventKind::Error, EventKind::Change]);
    }

    #[test]
    fn test_watcher_start_outside_runtime_keeps_routing() {
        let fx = fixture();
        fx.adapter.watcher_start(vec![Arc::new(Collector::default())]);
        assert!(fx.adapter.is_routing());

        let ev = fx
            .adapter
            .write_bundle(OutputOptions::new("/out"), bundle_of(&["a.js"]))
            .unwrap();
        assert_eq!(fx.bus.current().seq, ev.seq);
        assert!(matches!(fx.detector.state(), Readiness::Polling { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_build_start_is_not_timed() {
        let fx = fixture();
        fx.adapter.watcher_start(Vec::new());
        fx.adapter
            .build_start(&RecordingHost::default(), BuildOptions::default())
            .await
            .unwrap();

        // turn the cache directory into a file so the trigger cannot be reached
        let cache = fx.trigger.parent().unwrap().to_path_buf();
        std::fs::remove_dir_all(&cache).unwrap();
        std::fs::write(&cache, "").unwrap();

        let before = fx.bus.current().seq;
        let err = fx
            .adapter
            .build_start(&RecordingHost::default(), BuildOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::Trigger { .. }));
        assert_eq!(fx.bus.current().seq, before);

        tokio::time::advance(Duration::from_millis(150)).await;
        let ev = fx
            .adapter
            .write_bundle(OutputOptions::new("/out"), bundle_of(&["a.js"]))
            .unwrap();
        assert_eq!(ev.as_write_bundle().map(|w| w.duration), Some(0));
    }

    #[tokio::test]
    async fn test_watcher_start_resumes_running_session() {
        let fx = fixture();
        let first = Arc::new(Collector::default());
        let second = Arc::new(Collector::default());
        fx.adapter.watcher_start(vec![first.clone()]);
        fx.adapter.watcher_start(vec![second.clone()]);

        fx.adapter.watch_change("a.ts", ChangeKind::Updated);
        tokio::time::sleep(Duration::from_millis(20)).await;
        fx.adapter.close_watcher().await;

        assert_eq!(first.kinds(), vec![EventKind::Change]);
        assert!(second.kinds().is_empty());
    }
}
