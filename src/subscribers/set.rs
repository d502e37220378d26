//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes lifecycle events and ready signals to multiple
//! subscribers **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit_event` / `emit_ready` return immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow.
//!
//! ## Diagram
//! ```text
//!    emit_event / emit_ready
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event() / on_ready()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event() / on_ready()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event() / on_ready()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use super::Subscribe;
use crate::events::Event;
use crate::readiness::Ready;

/// One queued item.
#[derive(Clone)]
enum Delivery {
    Event(Arc<Event>),
    Ready(Arc<Ready>),
}

/// Per-subscriber channel with metadata
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Delivery>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Delivery>(cap);
            let s = Arc::clone(&sub);

            let handle = tokio::spawn(async move {
                while let Some(item) = rx.recv().await {
                    let fut = match &item {
                        Delivery::Event(ev) => s.on_event(ev),
                        Delivery::Ready(ready) => s.on_ready(ready),
                    };
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        warn!(subscriber = s.name(), panic = ?panic_err, "subscriber panicked");
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self { channels, workers }
    }

    /// Fan-out one lifecycle event to all subscribers (non-blocking).
    pub fn emit_event(&self, event: &Arc<Event>) {
        self.fan_out(Delivery::Event(Arc::clone(event)));
    }

    /// Fan-out one ready signal to all subscribers (non-blocking).
    pub fn emit_ready(&self, ready: Ready) {
        self.fan_out(Delivery::Ready(Arc::new(ready)));
    }

    /// If a subscriber's queue is **full** or **closed**, the item is dropped for
    /// it and a warning is logged with the subscriber's name.
    fn fan_out(&self, item: Delivery) {
        for channel in &self.channels {
            match channel.sender.try_send(item.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = channel.name, "dropped item: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(subscriber = channel.name, "dropped item: worker closed");
                }
            }
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}
