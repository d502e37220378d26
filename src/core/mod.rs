//! Coordination core: hook adapter, rebuild protocol and wiring.
//!
//! The public entry point is [`WatchContext`], built from a [`Config`] through
//! [`WatchContextBuilder`].
//!
//! Internal modules:
//! - [`adapter`]: host lifecycle hooks → bus publications;
//! - [`rebuild`]: trigger-file driven rebuild with readiness gating;
//! - [`session`]: subscriber fan-out between watcher start and close;
//! - [`trigger`]: the rebuild trigger file;
//! - [`context`] / [`builder`]: wiring of one coordination layer.

mod adapter;
mod builder;
mod config;
mod context;
mod rebuild;
mod session;
mod trigger;

pub use adapter::{LifecycleAdapter, WatchFiles};
pub use builder::WatchContextBuilder;
pub use config::{Config, DEFAULT_TRIGGER_NAME};
pub use context::WatchContext;
pub use rebuild::RebuildCoordinator;
pub use session::WatchSession;
pub use trigger::TriggerFile;
