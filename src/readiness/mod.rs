//! Readiness detection: turning "the host says it wrote" into "the files are on disk".
//!
//! ```text
//! Bus.publish_with(WriteBundle) ──► ReadinessDetector::observe()
//!                                        │  cancel previous poll
//!                                        ▼
//!                               poll loop (PollPolicy)
//!                                        │  every pass: Probe::modified() for the
//!                                        │  whole bundle, all > watermark?
//!                                        ▼
//!                       Readiness::Ready ──► ready() / ready_after() / next_ready()
//!                                       └──► ReadyStream (long-lived subscribers)
//! ```

mod detector;
mod probe;

pub use detector::{Readiness, ReadinessDetector, Ready, ReadyStream, bundle_on_disk};
pub use probe::{FsProbe, Probe};
