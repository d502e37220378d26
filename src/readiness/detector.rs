//! # ReadinessDetector: "is the bundle actually on disk?"
//!
//! Derives the ready signal of a write cycle by polling artifact modification
//! times until every one of them is newer than the cycle's watermark.
//!
//! ## State machine
//! ```text
//!   Idle ──BuildStart──► Building{seq} ──WriteBundle──► Polling{seq} ──all fresh──► Ready
//!    ▲                       ▲  │                          │   ▲                     │
//!    │                       │  └──────── BuildStart ──────┘   └──── WriteBundle ────┘
//!   Init                     └──────────────── BuildStart ───────────────────────────┘
//!
//!   Polling / Ready ──Change / Error──► Stale{seq} ──WriteBundle──► Polling
//!                                            └──────BuildStart────► Building
//! ```
//!
//! ## Rules
//! - A pass checks the **whole** bundle; a partial success is discarded and the
//!   next pass starts over.
//! - A missing or unreadable file is "not ready", never an error.
//! - An empty bundle is ready on the first pass without touching the probe.
//! - A new `BuildStart` or `WriteBundle` cancels the running poll; a stale poll
//!   can never mark a newer cycle ready.
//! - A `Change` or `Error` after a write makes that output stale: the poll is
//!   cancelled and `ready()` waits for the next `WriteBundle`. In `Idle` and
//!   `Building` they change nothing.
//! - No built-in bound: polling goes on until the files land or the cycle is
//!   superseded. Waiters can opt into `Config::ready_timeout`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::probe::Probe;
use crate::error::{WatchError, bounded};
use crate::events::{Event, Lifecycle, WriteBundle};
use crate::policies::PollPolicy;
use crate::runtime;

/// Ready signal of one write cycle.
#[derive(Debug, Clone)]
pub struct Ready {
    /// `seq` of the `WriteBundle` event this signal belongs to.
    pub seq: u64,
    /// The triggering write.
    pub write: Arc<WriteBundle>,
    /// Number of poll passes it took.
    pub passes: u32,
}

impl Ready {
    /// Build duration in milliseconds, as reported by the write.
    #[inline]
    pub fn duration(&self) -> u64 {
        self.write.duration
    }
}

/// Readiness of the current cycle.
#[derive(Debug, Clone, Default)]
pub enum Readiness {
    /// No cycle observed yet.
    #[default]
    Idle,
    /// A build started; nothing written yet.
    Building { seq: u64 },
    /// Output written; waiting for it to land on disk.
    Polling { seq: u64 },
    /// Output confirmed on disk.
    Ready(Ready),
    /// Output written, then invalidated by a change or an error at `seq`.
    Stale { seq: u64 },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }

    pub fn ready(&self) -> Option<&Ready> {
        match self {
            Readiness::Ready(r) => Some(r),
            _ => None,
        }
    }
}

/// Polls the filesystem for each write cycle and publishes its ready signal.
pub struct ReadinessDetector {
    probe: Arc<dyn Probe>,
    poll: PollPolicy,
    deadline: Option<Duration>,
    state: watch::Sender<Readiness>,
    ready_tx: broadcast::Sender<Ready>,
    root: CancellationToken,
    active: Mutex<Option<CancellationToken>>,
}

impl ReadinessDetector {
    /// Creates a detector.
    ///
    /// `deadline` bounds [`ready`](Self::ready), [`ready_after`](Self::ready_after)
    /// and [`next_ready`](Self::next_ready); `None` waits forever.
    pub fn new(
        probe: Arc<dyn Probe>,
        poll: PollPolicy,
        deadline: Option<Duration>,
        capacity: usize,
    ) -> Self {
        let (state, _) = watch::channel(Readiness::Idle);
        let (ready_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            probe,
            poll,
            deadline,
            state,
            ready_tx,
            root: CancellationToken::new(),
            active: Mutex::new(None),
        }
    }

    /// Applies one published event to the readiness state.
    ///
    /// Called synchronously from the bus publish hook, before any consumer sees
    /// the event. Starting a poll needs a Tokio runtime.
    pub fn observe(self: &Arc<Self>, ev: &Event) {
        match &ev.lifecycle {
            Lifecycle::BuildStart(_) => {
                self.cancel_active();
                self.state.send_replace(Readiness::Building { seq: ev.seq });
            }
            Lifecycle::WriteBundle(write) => {
                let token = self.replace_active();
                self.state.send_replace(Readiness::Polling { seq: ev.seq });
                self.spawn_poll(ev.seq, Arc::clone(write), token);
            }
            Lifecycle::Error(_) | Lifecycle::Change(_) => self.mark_stale(ev.seq),
            Lifecycle::Init => {}
        }
    }

    /// Snapshot of the current readiness.
    pub fn state(&self) -> Readiness {
        self.state.borrow().clone()
    }

    /// Watch receiver over readiness transitions.
    pub fn watch(&self) -> watch::Receiver<Readiness> {
        self.state.subscribe()
    }

    /// Stream of every successive ready signal.
    pub fn ready_stream(&self) -> ReadyStream {
        ReadyStream {
            rx: self.ready_tx.subscribe(),
        }
    }

    /// Readiness of the current cycle.
    ///
    /// Resolves immediately when the current cycle is already on disk; otherwise
    /// waits for the in-flight (or, from `Idle`, the first) cycle.
    pub async fn ready(&self) -> Result<Ready, WatchError> {
        self.wait_for(|_| true).await
    }

    /// Readiness of a cycle whose `WriteBundle` came after event `seq`.
    pub async fn ready_after(&self, seq: u64) -> Result<Ready, WatchError> {
        self.wait_for(move |r| r.seq > seq).await
    }

    /// The next ready signal emitted after this call.
    pub async fn next_ready(&self) -> Result<Ready, WatchError> {
        let mut rx = self.ready_stream();
        bounded(self.deadline, "readiness", async move {
            rx.recv().await.ok_or(WatchError::Closed)
        })
        .await
    }

    /// Polls until every artifact of `write` is newer than its watermark.
    ///
    /// Returns the number of passes taken. Never returns for a bundle that does
    /// not land.
    pub async fn poll_until_ready(&self, write: &WriteBundle) -> u32 {
        let mut pass: u32 = 0;
        loop {
            tokio::time::sleep(self.poll.delay()).await;
            pass = pass.saturating_add(1);

            if bundle_on_disk(self.probe.as_ref(), write).await {
                return pass;
            }
            trace!(
                pass,
                files = write.bundle.len(),
                probe = self.probe.name(),
                "bundle not on disk yet"
            );
        }
    }

    /// Stops every running poll. Used on context teardown.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    async fn wait_for<F>(&self, accept: F) -> Result<Ready, WatchError>
    where
        F: Fn(&Ready) -> bool,
    {
        let mut rx = self.state.subscribe();
        bounded(self.deadline, "readiness", async move {
            let state = rx
                .wait_for(|s| s.ready().is_some_and(&accept))
                .await
                .map_err(|_| WatchError::Closed)?;
            state.ready().cloned().ok_or(WatchError::Closed)
        })
        .await
    }

    fn spawn_poll(self: &Arc<Self>, seq: u64, write: Arc<WriteBundle>, token: CancellationToken) {
        let this = Arc::clone(self);
        let poll = async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(seq, "readiness poll superseded");
                }
                passes = this.poll_until_ready(&write) => {
                    this.resolve(Ready { seq, write: Arc::clone(&write), passes });
                }
            }
        };

        if let Some(handle) = runtime::current("readiness poll") {
            handle.spawn(poll);
        }
    }

    /// Marks the cycle ready unless it has been superseded meanwhile.
    fn resolve(&self, ready: Ready) {
        let ready_tx = &self.ready_tx;
        let resolved = self.state.send_if_modified(|state| match state {
            Readiness::Polling { seq } if *seq == ready.seq => {
                *state = Readiness::Ready(ready.clone());
                let _ = ready_tx.send(ready.clone());
                true
            }
            _ => false,
        });

        if resolved {
            debug!(
                seq = ready.seq,
                duration_ms = ready.duration(),
                passes = ready.passes,
                "files ready"
            );
        }
    }

    fn mark_stale(&self, seq: u64) {
        let stale = self.state.send_if_modified(|state| match state {
            Readiness::Polling { .. } | Readiness::Ready(_) => {
                *state = Readiness::Stale { seq };
                true
            }
            _ => false,
        });
        if stale {
            self.cancel_active();
            trace!(seq, "written output is stale until the next write");
        }
    }

    fn replace_active(&self) -> CancellationToken {
        let token = self.root.child_token();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = active.replace(token.clone()) {
            old.cancel();
        }
        token
    }

    fn cancel_active(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = active.take() {
            old.cancel();
        }
    }
}

/// One poll pass: `true` only if **every** artifact is strictly newer than the
/// watermark.
pub async fn bundle_on_disk(probe: &dyn Probe, write: &WriteBundle) -> bool {
    for rel in write.bundle.keys() {
        let path = write.options.dir.join(rel);
        match probe.modified(&path).await {
            Ok(mtime) if mtime > write.timestamp => {}
            Ok(_) => return false,
            Err(err) => {
                trace!(path = %path.display(), %err, "artifact not readable yet");
                return false;
            }
        }
    }
    true
}

/// Receiver of successive ready signals.
#[derive(Debug)]
pub struct ReadyStream {
    rx: broadcast::Receiver<Ready>,
}

impl ReadyStream {
    /// Waits for the next ready signal; `None` once the detector is gone.
    pub async fn recv(&mut self) -> Option<Ready> {
        loop {
            match self.rx.recv().await {
                Ok(ready) => return Some(ready),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "ready stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns a ready signal already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Ready> {
        loop {
            match self.rx.try_recv() {
                Ok(ready) => return Some(ready),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "ready stream lagged");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
