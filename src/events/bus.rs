//! # Event bus for lifecycle events.
//!
//! [`Bus`] pairs a [`tokio::sync::broadcast`] ring (the ordered event stream) with a
//! [`tokio::sync::watch`] cell (the "current event" snapshot).
//!
//! ## Architecture
//! ```text
//! Producer (one):                     Consumers (many):
//!   LifecycleAdapter ──► publish() ──┬──► watch cell      ──► current()
//!                          │         └──► broadcast ring  ──► EventStream (all)
//!                          │                                ├► build_starts()
//!                          ▼                                ├► writes()
//!                   stamp seq + at                          ├► errors()
//!                   (under publish lock)                    └► changes()
//! ```
//!
//! ## Rules
//! - **Ordered**: stamping, snapshot update and broadcast happen under one lock, so
//!   every receiver sees events in `seq` order.
//! - **Synchronous**: when `publish()` returns, the event is queued for every
//!   receiver that existed at that moment.
//! - **No replay**: a receiver only gets events sent after it subscribed; late
//!   consumers use [`Bus::current`].
//! - **Infallible**: publishing never fails, even with no receivers.
//! - **Lag handling**: slow receivers skip the oldest events (logged as a warning).

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::warn;

use super::event::{Event, EventKind, Lifecycle};

/// Ordered broadcast channel of lifecycle events with a last-value snapshot.
///
/// Cheap to clone; all clones share the same channel and snapshot.
#[derive(Clone, Debug)]
pub struct Bus {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    tx: broadcast::Sender<Arc<Event>>,
    current: watch::Sender<Arc<Event>>,
    seq: Mutex<u64>,
}

impl Bus {
    /// Creates a new bus holding [`Lifecycle::Init`] with the given ring capacity.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Arc<Event>>(capacity);
        let (current, _) = watch::channel(Arc::new(Event::stamped(0, Lifecycle::Init)));
        Self {
            inner: Arc::new(Inner {
                tx,
                current,
                seq: Mutex::new(0),
            }),
        }
    }

    /// Publishes an event and returns it as stamped.
    pub fn publish(&self, lifecycle: Lifecycle) -> Arc<Event> {
        self.publish_with(lifecycle, |_| {})
    }

    /// Publishes an event, running `before_send` after stamping and before any
    /// consumer can observe the event.
    ///
    /// `before_send` runs under the publish lock; it must not block or publish.
    pub fn publish_with<F>(&self, lifecycle: Lifecycle, before_send: F) -> Arc<Event>
    where
        F: FnOnce(&Arc<Event>),
    {
        let mut seq = self.inner.seq.lock().unwrap_or_else(PoisonError::into_inner);
        *seq += 1;

        let ev = Arc::new(Event::stamped(*seq, lifecycle));
        before_send(&ev);

        self.inner.current.send_replace(Arc::clone(&ev));
        let _ = self.inner.tx.send(Arc::clone(&ev));
        ev
    }

    /// Returns the most recently published event (`Init` if none).
    pub fn current(&self) -> Arc<Event> {
        self.inner.current.borrow().clone()
    }

    /// Subscribes to every event published from now on.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.inner.tx.subscribe(),
            filter: None,
        }
    }

    /// Subscribes to events of one kind only.
    pub fn subscribe_kind(&self, kind: EventKind) -> EventStream {
        EventStream {
            rx: self.inner.tx.subscribe(),
            filter: Some(kind),
        }
    }

    /// Stream of [`Lifecycle::BuildStart`] events.
    pub fn build_starts(&self) -> EventStream {
        self.subscribe_kind(EventKind::BuildStart)
    }

    /// Stream of [`Lifecycle::WriteBundle`] events.
    pub fn writes(&self) -> EventStream {
        self.subscribe_kind(EventKind::WriteBundle)
    }

    /// Stream of [`Lifecycle::Error`] events.
    pub fn errors(&self) -> EventStream {
        self.subscribe_kind(EventKind::Error)
    }

    /// Stream of [`Lifecycle::Change`] events.
    pub fn changes(&self) -> EventStream {
        self.subscribe_kind(EventKind::Change)
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

/// Receiver side of the [`Bus`], optionally filtered by [`EventKind`].
#[derive(Debug)]
pub struct EventStream {
    rx: broadcast::Receiver<Arc<Event>>,
    filter: Option<EventKind>,
}

impl EventStream {
    /// Waits for the next matching event.
    ///
    /// Returns `None` once the bus is gone. Lagged items are skipped.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.rx.recv().await {
                Ok(ev) => {
                    if self.filter.is_none_or(|kind| ev.kind() == kind) {
                        return Some(ev);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, filter = ?self.filter, "event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next matching event already queued, without waiting.
    ///
    /// `None` when nothing is queued or the bus is gone. Lagged items are skipped.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.rx.try_recv() {
                Ok(ev) => {
                    if self.filter.is_none_or(|kind| ev.kind() == kind) {
                        return Some(ev);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, filter = ?self.filter, "event stream lagged");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// The kind this stream is restricted to, if any.
    pub fn filter(&self) -> Option<EventKind> {
        self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BuildFailure, BuildOptions, ChangeKind};

    fn start() -> Lifecycle {
        Lifecycle::build_start(BuildOptions::default())
    }

    #[test]
    fn test_current_starts_at_init() {
        let bus = Bus::new(8);
        let cur = bus.current();
        assert_eq!(cur.kind(), EventKind::Init);
        assert_eq!(cur.seq, 0);
    }

    #[test]
    fn test_current_tracks_last_publish() {
        let bus = Bus::new(8);
        bus.publish(start());
        bus.publish(Lifecycle::Error(BuildFailure::message("boom")));
        let last = bus.publish(Lifecycle::change("a.ts", ChangeKind::Updated));

        let cur = bus.current();
        assert_eq!(cur.kind(), EventKind::Change);
        assert_eq!(cur.seq, last.seq);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_emission_order() {
        let bus = Bus::new(16);
        let mut all = bus.subscribe();

        bus.publish(start());
        bus.publish(Lifecycle::change("a.ts", ChangeKind::Created));
        bus.publish(Lifecycle::Error(BuildFailure::message("x")));

        let kinds = [
            all.recv().await.unwrap(),
            all.recv().await.unwrap(),
            all.recv().await.unwrap(),
        ];
        assert_eq!(kinds[0].kind(), EventKind::BuildStart);
        assert_eq!(kinds[1].kind(), EventKind::Change);
        assert_eq!(kinds[2].kind(), EventKind::Error);
        assert!(kinds[0].seq < kinds[1].seq && kinds[1].seq < kinds[2].seq);
    }

    #[tokio::test]
    async fn test_filtered_stream_only_yields_its_kind() {
        let bus = Bus::new(16);
        let mut starts = bus.build_starts();

        bus.publish(Lifecycle::change("a.ts", ChangeKind::Updated));
        bus.publish(Lifecycle::Error(BuildFailure::message("x")));
        let expected = bus.publish(start());

        let got = starts.recv().await.unwrap();
        assert_eq!(got.kind(), EventKind::BuildStart);
        assert_eq!(got.seq, expected.seq);
        assert!(got.as_build_start().is_some());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_only_current_value() {
        let bus = Bus::new(16);
        bus.publish(start());
        let early = bus.publish(Lifecycle::change("b.ts", ChangeKind::Deleted));

        let mut late = bus.subscribe();
        assert_eq!(bus.current().seq, early.seq);

        let next = bus.publish(Lifecycle::Error(BuildFailure::default()));
        let got = late.recv().await.unwrap();
        assert_eq!(got.seq, next.seq);
    }

    #[tokio::test]
    async fn test_lagged_stream_skips_oldest() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(Lifecycle::change(format!("{i}.ts"), ChangeKind::Updated));
        }
        let got = rx.recv().await.unwrap();
        assert_eq!(got.seq, 4);
        let got = rx.recv().await.unwrap();
        assert_eq!(got.seq, 5);
    }

    #[tokio::test]
    async fn test_writes_stream_and_receiver_count() {
        let bus = Bus::new(8);
        assert_eq!(bus.receiver_count(), 0);
        let mut writes = bus.writes();
        let all = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);
        assert_eq!(writes.filter(), Some(EventKind::WriteBundle));
        assert_eq!(all.filter(), None);

        bus.publish(start());
        let ev = bus.publish(Lifecycle::WriteBundle(Arc::new(
            crate::events::WriteBundle {
                options: crate::events::OutputOptions::new("/out"),
                bundle: Arc::default(),
                duration: 7,
                timestamp: std::time::SystemTime::now(),
            },
        )));
        let got = writes.recv().await.unwrap();
        assert_eq!(got.seq, ev.seq);
        assert_eq!(got.as_write_bundle().map(|w| w.duration), Some(7));

        drop(all);
        assert_eq!(bus.receiver_count(), 1);
    }

    #[test]
    fn test_try_recv_returns_queued_matching_events() {
        let bus = Bus::new(8);
        let mut errors = bus.errors();
        assert!(errors.try_recv().is_none());

        bus.publish(start());
        let failed = bus.publish(Lifecycle::Error(BuildFailure::message("boom")));
        bus.publish(Lifecycle::change("a.ts", ChangeKind::Updated));

        assert_eq!(errors.try_recv().map(|ev| ev.seq), Some(failed.seq));
        assert!(errors.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_bus_dropped() {
        let bus = Bus::new(4);
        let mut rx = bus.subscribe();
        drop(bus);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_publish_with_runs_hook_before_snapshot() {
        let bus = Bus::new(4);
        let mut seen = None;
        let ev = bus.publish_with(start(), |ev| {
            seen = Some((ev.seq, bus.current().seq));
        });
        assert_eq!(seen, Some((ev.seq, 0)));
        assert_eq!(bus.current().seq, ev.seq);
    }
}
