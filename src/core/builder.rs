use std::sync::Arc;

use super::{
    Config, adapter::LifecycleAdapter, context::WatchContext, rebuild::RebuildCoordinator,
    trigger::TriggerFile,
};
use crate::{
    events::Bus,
    readiness::{FsProbe, Probe, ReadinessDetector},
};

/// Builder for constructing a [`WatchContext`].
pub struct WatchContextBuilder {
    cfg: Config,
    probe: Arc<dyn Probe>,
}

impl WatchContextBuilder {
    /// Creates a new builder with the given configuration and the filesystem probe.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            probe: Arc::new(FsProbe),
        }
    }

    /// Replaces the source of artifact modification times.
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    /// Builds the context.
    ///
    /// All components share one bus, one readiness detector and one trigger file:
    /// - Event bus with the `Init` snapshot
    /// - Readiness detector fed by the bus publish hook
    /// - Lifecycle adapter (the only publisher)
    /// - Rebuild coordinator
    pub fn build(self) -> Arc<WatchContext> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let detector = Arc::new(ReadinessDetector::new(
            self.probe,
            self.cfg.poll,
            self.cfg.ready_deadline(),
            self.cfg.bus_capacity_clamped(),
        ));
        let trigger = TriggerFile::new(self.cfg.trigger_path());

        let adapter = LifecycleAdapter::new(bus.clone(), Arc::clone(&detector), trigger.clone());
        let coordinator = RebuildCoordinator::new(
            bus.clone(),
            Arc::clone(&detector),
            trigger.clone(),
            self.cfg.ready_deadline(),
        );

        Arc::new(WatchContext::new_internal(
            self.cfg,
            bus,
            detector,
            trigger,
            adapter,
            coordinator,
        ))
    }
}
