//! # RebuildCoordinator: "run one more cycle and tell me when it is on disk".
//!
//! ## Protocol
//! ```text
//! request_rebuild()
//!   ├─► lock gate                       (one rebuild in flight)
//!   ├─► 1. detector.ready()             (previous cycle stable on disk)
//!   ├─► subscribe BuildStart
//!   ├─► 2. try_join!( trigger.touch(), next BuildStart )
//!   └─► 3. detector.ready_after(build_start.seq)
//! ```
//!
//! ## Rules
//! - The trigger is never written while the previous cycle is still landing:
//!   concurrent callers queue on the gate and each re-checks step 1.
//! - The returned [`Ready`] always belongs to a cycle that started after the
//!   trigger write, never to the previous one.
//! - A cycle that fails (`Error` instead of `WriteBundle`) leaves step 3 pending;
//!   with `Config::ready_timeout` set it fails with `WatchError::Timeout`.
//! - From `Init`, step 1 waits for the first cycle to become ready.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use super::trigger::TriggerFile;
use crate::error::{WatchError, bounded};
use crate::events::Bus;
use crate::readiness::{ReadinessDetector, Ready};

/// Serializes rebuild requests over the shared trigger file.
pub struct RebuildCoordinator {
    bus: Bus,
    detector: Arc<ReadinessDetector>,
    trigger: TriggerFile,
    deadline: Option<Duration>,
    gate: Mutex<()>,
}

impl RebuildCoordinator {
    pub(crate) fn new(
        bus: Bus,
        detector: Arc<ReadinessDetector>,
        trigger: TriggerFile,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            bus,
            detector,
            trigger,
            deadline,
            gate: Mutex::new(()),
        }
    }

    /// Triggers a new build cycle and resolves once its output is on disk.
    pub async fn request_rebuild(&self) -> Result<Ready, WatchError> {
        let _in_flight = self.gate.lock().await;
        debug!("rebuild start");

        self.detector.ready().await?;

        let mut starts = self.bus.build_starts();
        let next_start = bounded(self.deadline, "build start", async move {
            starts.recv().await.ok_or(WatchError::Closed)
        });
        let ((), started) = tokio::try_join!(self.trigger.touch(), next_start)?;

        let ready = self.detector.ready_after(started.seq).await?;
        debug!(
            seq = ready.seq,
            duration_ms = ready.duration(),
            "rebuild end"
        );
        Ok(ready)
    }

    /// Whether a rebuild is currently in flight.
    pub fn is_rebuilding(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}
