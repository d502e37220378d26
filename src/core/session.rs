//! # WatchSession: subscriber scope between watcher start and stop.
//!
//! ```text
//! watcher_start(subs) ──► WatchSession::start()
//!                              ├─ bus.subscribe()          (before spawning: nothing missed)
//!                              ├─ detector.ready_stream()
//!                              └─ spawn listener ──► SubscriberSet::emit_event / emit_ready
//!
//! close_watcher() ──► WatchSession::stop()
//!                              ├─ token.cancel()
//!                              └─ join listener ──► forward what is still queued
//!                                               └─► SubscriberSet::shutdown() (drain + join workers)
//! ```
//!
//! Everything published before `stop()` reaches the subscribers. Outside a Tokio
//! runtime no session is started.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::{Bus, EventStream};
use crate::readiness::{ReadinessDetector, ReadyStream};
use crate::runtime;
use crate::subscribers::{Subscribe, SubscriberSet};

/// A running watch session.
pub struct WatchSession {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl WatchSession {
    /// Subscribes to the bus and ready stream, then spawns the fan-out listener.
    ///
    /// Returns `None` (logged) when called outside a Tokio runtime.
    pub fn start(
        bus: &Bus,
        detector: &ReadinessDetector,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Option<Self> {
        let handle = runtime::current("watch session")?;

        let events = bus.subscribe();
        let ready = detector.ready_stream();
        let set = SubscriberSet::new(subscribers);
        let token = CancellationToken::new();

        debug!(subscribers = set.len(), "watch session started");
        let listener = handle.spawn(listen(events, ready, set, token.clone()));
        Some(Self { token, listener })
    }

    /// Whether the listener is still forwarding.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && !self.listener.is_finished()
    }

    /// Stops forwarding and waits until every subscriber drained its queue.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.listener.await;
        debug!("watch session stopped");
    }
}

async fn listen(
    mut events: EventStream,
    mut ready: ReadyStream,
    set: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            ev = events.recv() => match ev {
                Some(ev) => set.emit_event(&ev),
                None => break,
            },
            r = ready.recv() => match r {
                Some(r) => set.emit_ready(r),
                None => break,
            },
        }
    }

    while let Some(ev) = events.try_recv() {
        set.emit_event(&ev);
    }
    while let Some(r) = ready.try_recv() {
        set.emit_ready(r);
    }
    set.shutdown().await;
}
