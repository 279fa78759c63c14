use std::sync::Arc;

use async_trait::async_trait;

use chronus_core::error::Result;
use chronus_core::metric::catalog::{CPU_NUM, CPU_TIME, CPU_UTILIZATION};
use chronus_core::MetricRegistry;

use crate::pipeline::{ProbeStage, SampleResultExt};
use crate::probe::HostProbe;

const METRICS: &[&str] = &[CPU_NUM.name, CPU_TIME.name, CPU_UTILIZATION.name];

pub struct CpuStage {
    probe: Arc<dyn HostProbe>,
}

impl CpuStage {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl ProbeStage for CpuStage {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn metrics(&self) -> &'static [&'static str] {
        METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let cpu = self.probe.cpu().await?;

        out.instance_for(CPU_NUM.name)?
            .value(cpu.logical_cores)
            .or_skip()?;

        let times = out.instance_for(CPU_TIME.name)?;
        for (mode, secs) in [
            ("user", cpu.times.user),
            ("system", cpu.times.system),
            ("idle", cpu.times.idle),
        ] {
            times.set_label("mode", mode).commit(secs).or_skip()?;
        }

        out.instance_for(CPU_UTILIZATION.name)?
            .value(cpu.utilization)
            .or_skip()
    }
}
