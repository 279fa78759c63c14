use std::sync::Arc;

use async_trait::async_trait;

use chronus_core::error::Result;
use chronus_core::metric::catalog::{MEMORY_FREE_BYTES, MEMORY_TOTAL_BYTES};
use chronus_core::MetricRegistry;

use crate::pipeline::{ProbeStage, SampleResultExt};
use crate::probe::HostProbe;

const METRICS: &[&str] = &[MEMORY_TOTAL_BYTES.name, MEMORY_FREE_BYTES.name];

pub struct MemoryStage {
    probe: Arc<dyn HostProbe>,
}

impl MemoryStage {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl ProbeStage for MemoryStage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn metrics(&self) -> &'static [&'static str] {
        METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let mem = self.probe.memory().await?;

        let total = out.instance_for(MEMORY_TOTAL_BYTES.name)?;
        total.set_label("type", "physical").commit(mem.total).or_skip()?;
        total.set_label("type", "swap").commit(mem.swap_total).or_skip()?;

        // physical "free" is what can be handed out without swapping
        let free = out.instance_for(MEMORY_FREE_BYTES.name)?;
        free.set_label("type", "physical").commit(mem.available).or_skip()?;
        free.set_label("type", "swap").commit(mem.swap_free).or_skip()
    }
}
