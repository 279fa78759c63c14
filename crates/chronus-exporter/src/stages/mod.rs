//! Host probe stages.
//!
//! A stage maps one probe snapshot onto catalog metrics. It derives label
//! keys where the source has no stable device identity and clamps
//! implausible thresholds, nothing more.

pub mod cpu;
pub mod disk;
pub mod latency;
pub mod memory;
pub mod network;
pub mod temperature;

use std::sync::Arc;

use crate::config::ExporterConfig;
use crate::pipeline::{collaborator_budget, ProbeStage};
use crate::probe::HostProbe;

pub use cpu::CpuStage;
pub use disk::{DiskIoStage, DiskSpaceStage};
pub use latency::LatencyStage;
pub use memory::MemoryStage;
pub use network::NetworkStage;
pub use temperature::{HddTempStage, TemperatureStage};

/// Host stages in declared order, minus the ones disabled by config.
pub fn host_stages(probe: Arc<dyn HostProbe>, cfg: &ExporterConfig) -> Vec<Arc<dyn ProbeStage>> {
    let mut stages: Vec<Arc<dyn ProbeStage>> = vec![
        Arc::new(CpuStage::new(Arc::clone(&probe))),
        Arc::new(MemoryStage::new(Arc::clone(&probe))),
        Arc::new(DiskSpaceStage::new(Arc::clone(&probe))),
        Arc::new(DiskIoStage::new(Arc::clone(&probe))),
        Arc::new(NetworkStage::new(Arc::clone(&probe))),
        Arc::new(TemperatureStage::new(
            Arc::clone(&probe),
            cfg.temperature.ceiling_celsius,
        )),
    ];
    if cfg.temperature.hddtemp_enabled() {
        stages.push(Arc::new(HddTempStage::new(Arc::clone(&probe))));
    }
    stages.push(Arc::new(LatencyStage::new(
        probe,
        cfg.host.ping_targets.clone(),
        collaborator_budget(cfg.collect.stage_timeout()),
    )));

    stages.retain(|s| {
        let disabled = cfg.collect.is_disabled(s.name());
        if disabled {
            tracing::info!(stage = %s.name(), "stage disabled by config");
        }
        !disabled
    });
    stages
}
