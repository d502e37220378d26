//! # buildvisor
//!
//! **Buildvisor** is a build-lifecycle coordination layer for watch-mode bundlers.
//!
//! It turns the hooks a host build tool calls (build start, bundle written,
//! render error, watched file changed) into an ordered stream of lifecycle
//! events, decides when a written bundle is actually on disk, and lets callers
//! request "one more build" and wait until that build's output has landed.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌───────────────────────────── host build tool (watch mode) ─────────────────────────────┐
//!     │ watcher start   build start   write bundle   render error   watch change   close       │
//!     └───────┬──────────────┬──────────────┬──────────────┬──────────────┬────────────┬───────┘
//!             ▼              ▼              ▼              ▼              ▼            ▼
//! ┌───────────────────────────────────────────────────────────────────────────────────────────┐
//! │  LifecycleAdapter (the only publisher)                                                    │
//! │  - ensures the trigger file exists and is a watched input                                 │
//! │  - stamps duration / watermark on every write                                             │
//! └─────────────────────────────────────────┬─────────────────────────────────────────────────┘
//!                                           │ Bus::publish_with(lifecycle, hook)
//!                                           ▼
//! ┌──────────────────────────────┐   hook   ┌─────────────────────────────────────────────────┐
//! │ ReadinessDetector            │◄─────────┤ Bus (seq stamping, broadcast + last value)      │
//! │ Idle/Building/Polling/Ready  │          └───────┬───────────────────┬─────────────────────┘
//! │ polls mtimes > watermark     │                  ▼                   ▼
//! └──────────────┬───────────────┘           WatchSession        external streams
//!                │ ready signals             (SubscriberSet)     (subscribe / errors / changes)
//!                ▼                                  │
//!        ready() / next_ready()             ┌───────┼───────┐
//!        ready_stream()                     ▼       ▼       ▼
//!                ▲                      LogWriter  sub2    subN
//!                │
//! ┌──────────────┴───────────────┐
//! │ RebuildCoordinator           │── touch ──► trigger file ──► host sees a change ──► new cycle
//! │ (one rebuild in flight)      │
//! └──────────────────────────────┘
//! ```
//!
//! ### Rebuild protocol
//! ```text
//! request_rebuild()
//!   ├─► wait for the current cycle to be on disk
//!   ├─► touch the trigger file  ┐ concurrently
//!   ├─► wait for the BuildStart ┘
//!   └─► wait for readiness of a cycle that started after the touch
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------------|---------------------------------------------|
//! | **Events**        | Ordered lifecycle events with a current-value snapshot.            | [`Bus`], [`Event`], [`Lifecycle`]           |
//! | **Readiness**     | On-disk confirmation of written bundles.                           | [`ReadinessDetector`], [`Ready`], [`Probe`] |
//! | **Hooks**         | Host hook surface and watch sessions.                              | [`LifecycleAdapter`], [`WatchFiles`]        |
//! | **Rebuilds**      | Serialized, readiness-gated rebuild requests.                      | [`RebuildCoordinator`]                      |
//! | **Subscriber API**| Observe a watch session (logging, dev-server reloads, ...).        | [`Subscribe`]                               |
//! | **Errors**        | Typed errors of the coordination layer.                            | [`WatchError`]                              |
//! | **Configuration** | Trigger location, poll pacing, wait bounds.                        | [`Config`], [`PollPolicy`]                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use buildvisor::{BuildOptions, Config, OutputArtifact, OutputOptions, PollPolicy, WatchContext};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = std::env::temp_dir().join("buildvisor-doc");
//!     let mut cfg = Config::with_cache_dir(dir.join("cache"));
//!     cfg.poll = PollPolicy::fixed(Duration::from_millis(10));
//!
//!     let ctx = WatchContext::new(cfg);
//!     let adapter = ctx.adapter();
//!     adapter.watcher_start(Vec::new());
//!
//!     // The host registers the trigger file as a watched input.
//!     let watch_file = |path: &std::path::Path| println!("watching {}", path.display());
//!     adapter.build_start(&watch_file, BuildOptions::default()).await?;
//!
//!     // The host writes the bundle, then reports it.
//!     let out = dir.join("dist");
//!     std::fs::create_dir_all(&out)?;
//!     let bundle = [("main.js".to_string(), OutputArtifact::chunk("main.js"))].into();
//!     adapter.write_bundle(OutputOptions::new(&out), bundle);
//!     tokio::time::sleep(Duration::from_millis(20)).await;
//!     std::fs::write(out.join("main.js"), "export {}")?;
//!
//!     let ready = ctx.ready().await?;
//!     println!("bundle on disk after {} passes", ready.passes);
//!
//!     adapter.close_watcher().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod readiness;
mod runtime;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{
    Config, DEFAULT_TRIGGER_NAME, LifecycleAdapter, RebuildCoordinator, TriggerFile,
    WatchContext, WatchContextBuilder, WatchFiles, WatchSession,
};
pub use error::WatchError;
pub use events::{
    ArtifactKind, BuildFailure, BuildOptions, BuildStart, Bundle, Bus, ChangeKind, ErrorDetail,
    Event, EventKind, EventStream, FileChange, Lifecycle, OutputArtifact, OutputOptions,
    WriteBundle,
};
pub use policies::PollPolicy;
pub use readiness::{FsProbe, Probe, Readiness, ReadinessDetector, Ready, ReadyStream, bundle_on_disk};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
