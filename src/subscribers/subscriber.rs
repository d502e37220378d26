//! # Session subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for observing a watch session:
//! lifecycle events from the bus and ready signals from the detector.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Rules
//! - Subscribers observe; they have no effect on readiness or rebuild ordering.
//! - Events and ready signals are processed sequentially (FIFO) per subscriber.
//! - Queue overflow drops the item **for this subscriber only**.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use buildvisor::{Event, EventKind, Ready, Subscribe};
//!
//! struct Timings;
//!
//! #[async_trait]
//! impl Subscribe for Timings {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind() == EventKind::Error {
//!             // count failures, etc.
//!         }
//!     }
//!
//!     async fn on_ready(&self, ready: &Ready) {
//!         let _ms = ready.duration();
//!     }
//!
//!     fn name(&self) -> &'static str { "timings" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;
use crate::readiness::Ready;

/// Observer of a watch session.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single lifecycle event.
    async fn on_event(&self, event: &Event);

    /// Processes a ready signal. Default: ignored.
    async fn on_ready(&self, ready: &Ready) {
        let _ = ready;
    }

    /// Returns the subscriber name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (min 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
