//! # WatchContext: one coordination layer per build process.
//!
//! [`WatchContext`] owns the shared parts and hands out the views consumers need:
//!
//! ```text
//!                  ┌──────────────── WatchContext ────────────────┐
//! host hooks ──►   │ LifecycleAdapter ──publish_with──► Bus ──────┼──► subscribe() / errors() / changes()
//!                  │                        │ (hook)              │
//!                  │                        ▼                     │
//!                  │               ReadinessDetector ─────────────┼──► ready() / next_ready() / ready_stream()
//!                  │                        ▲                     │
//!                  │ RebuildCoordinator ────┘ (+ TriggerFile) ────┼──► request_rebuild()
//!                  └──────────────────────────────────────────────┘
//! ```
//!
//! Dropping the context stops every running readiness poll.

use std::path::Path;
use std::sync::Arc;

use super::{
    Config, adapter::LifecycleAdapter, builder::WatchContextBuilder, rebuild::RebuildCoordinator,
    trigger::TriggerFile,
};
use crate::error::{WatchError, bounded};
use crate::events::{Bus, Event, EventStream};
use crate::readiness::{Readiness, ReadinessDetector, Ready, ReadyStream};

/// Shared coordination state of one build process.
pub struct WatchContext {
    cfg: Config,
    bus: Bus,
    detector: Arc<ReadinessDetector>,
    trigger: TriggerFile,
    adapter: LifecycleAdapter,
    coordinator: RebuildCoordinator,
}

impl WatchContext {
    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        detector: Arc<ReadinessDetector>,
        trigger: TriggerFile,
        adapter: LifecycleAdapter,
        coordinator: RebuildCoordinator,
    ) -> Self {
        Self {
            cfg,
            bus,
            detector,
            trigger,
            adapter,
            coordinator,
        }
    }

    /// Creates a builder for constructing a context.
    pub fn builder(cfg: Config) -> WatchContextBuilder {
        WatchContextBuilder::new(cfg)
    }

    /// Creates a context probing the real filesystem.
    pub fn new(cfg: Config) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The hook surface the host build tool drives.
    pub fn adapter(&self) -> &LifecycleAdapter {
        &self.adapter
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn trigger_path(&self) -> &Path {
        self.trigger.path()
    }

    /// Snapshot of the current cycle's readiness.
    pub fn readiness(&self) -> Readiness {
        self.detector.state()
    }

    /// Most recent lifecycle event (`Init` before the first hook).
    pub fn current(&self) -> Arc<Event> {
        self.bus.current()
    }

    /// Every lifecycle event published from now on.
    pub fn subscribe(&self) -> EventStream {
        self.bus.subscribe()
    }

    /// `Error` events only.
    pub fn errors(&self) -> EventStream {
        self.bus.errors()
    }

    /// `Change` events only.
    pub fn changes(&self) -> EventStream {
        self.bus.changes()
    }

    /// Waits for the next `BuildStart` published after this call.
    pub async fn next_build_start(&self) -> Result<Arc<Event>, WatchError> {
        let mut starts = self.bus.build_starts();
        bounded(self.cfg.ready_deadline(), "build start", async move {
            starts.recv().await.ok_or(WatchError::Closed)
        })
        .await
    }

    /// Readiness of the current cycle; see [`ReadinessDetector::ready`].
    pub async fn ready(&self) -> Result<Ready, WatchError> {
        self.detector.ready().await
    }

    /// The next ready signal emitted after this call.
    pub async fn next_ready(&self) -> Result<Ready, WatchError> {
        self.detector.next_ready().await
    }

    pub fn ready_stream(&self) -> ReadyStream {
        self.detector.ready_stream()
    }

    /// Triggers one more build cycle; see [`RebuildCoordinator::request_rebuild`].
    pub async fn request_rebuild(&self) -> Result<Ready, WatchError> {
        self.coordinator.request_rebuild().await
    }

    pub fn is_rebuilding(&self) -> bool {
        self.coordinator.is_rebuilding()
    }
}

impl Drop for WatchContext {
    fn drop(&mut self) {
        self.detector.shutdown();
    }
}
