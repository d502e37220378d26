//! Lifecycle events: data model and broadcast bus.
//!
//! ## Contents
//! - [`Lifecycle`], [`Event`], [`EventKind`] event payloads and classification
//! - [`Bus`], [`EventStream`] ordered broadcast with a last-value snapshot
//!
//! ## Quick reference
//! - **Publisher**: `LifecycleAdapter` (the only producer).
//! - **Consumers**: `ReadinessDetector` (through the publish hook),
//!   `RebuildCoordinator`, the watch-session listener and any external stream.

mod bus;
mod event;

pub use bus::{Bus, EventStream};
pub use event::{
    ArtifactKind, BuildFailure, BuildOptions, BuildStart, Bundle, ChangeKind, ErrorDetail, Event,
    EventKind, FileChange, Lifecycle, OutputArtifact, OutputOptions, WriteBundle,
};
