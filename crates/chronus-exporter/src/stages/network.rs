use std::sync::Arc;

use async_trait::async_trait;

use chronus_core::error::Result;
use chronus_core::metric::catalog::{NETWORK_STATS, NETWORK_TRAFFICS};
use chronus_core::MetricRegistry;

use crate::pipeline::{ProbeStage, SampleResultExt};
use crate::probe::HostProbe;

const METRICS: &[&str] = &[NETWORK_STATS.name, NETWORK_TRAFFICS.name];

pub struct NetworkStage {
    probe: Arc<dyn HostProbe>,
}

impl NetworkStage {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl ProbeStage for NetworkStage {
    fn name(&self) -> &'static str {
        "network"
    }

    fn metrics(&self) -> &'static [&'static str] {
        METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let stats = out.instance_for(NETWORK_STATS.name)?;
        for nic in self.probe.interfaces().await? {
            stats
                .set_label("device", &nic.device)
                .set_label("up", nic.up)
                .set_label("speed", nic.speed)
                .set_label("mtu", nic.mtu)
                .commit(1u32)
                .or_skip()?;
        }

        let traffics = out.instance_for(NETWORK_TRAFFICS.name)?;
        for t in self.probe.traffics().await? {
            let rows = [
                ("sent", "bytes", Some(t.bytes_sent)),
                ("recv", "bytes", Some(t.bytes_recv)),
                ("sent", "packets", Some(t.packets_sent)),
                ("recv", "packets", Some(t.packets_recv)),
                ("sent", "err", Some(t.err_out)),
                ("recv", "err", Some(t.err_in)),
                ("sent", "drop", t.drop_out),
                ("recv", "drop", t.drop_in),
            ];
            // counters the platform does not expose are omitted, not zeroed
            for (direction, name, value) in rows {
                let Some(value) = value else { continue };
                traffics
                    .set_label("device", &t.device)
                    .set_label("type", direction)
                    .set_label("name", name)
                    .commit(value)
                    .or_skip()?;
            }
        }
        Ok(())
    }
}
