//! Polling policy.
//!
//! ## Contents
//! - [`PollPolicy`] how long the readiness detector waits between passes
//!
//! ## Defaults
//! - `PollPolicy::default()` → fixed 100ms tick.

mod poll;

pub use poll::PollPolicy;
