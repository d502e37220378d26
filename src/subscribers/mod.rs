//! # Watch-session subscribers.
//!
//! This module provides the [`Subscribe`] trait and the fan-out used by a watch
//! session to feed lifecycle events and ready signals to observers.
//!
//! ## Architecture
//! ```text
//! Bus ───────────┐
//!                ├──► session listener ──► SubscriberSet ──► Subscribe::on_event / on_ready
//! ReadyStream ───┘                               │
//!                                         ┌──────┴──────┬─────────┐
//!                                         ▼             ▼         ▼
//!                                     LogWriter      Custom      ...
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
