use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::time::timeout;

use chronus_core::error::{ChronusError, Result};
use chronus_core::metric::catalog::PING_LATENCY;
use chronus_core::MetricRegistry;

use crate::pipeline::{ProbeStage, SampleResultExt};
use crate::probe::HostProbe;

const METRICS: &[&str] = &[PING_LATENCY.name];

/// Average ping latency to each configured target, pinged concurrently.
///
/// An unreachable target is logged and left out; the other targets are still
/// reported. Each ping gets `per_target`, which must stay below the stage
/// budget so one blackholed target cannot time the whole stage out.
pub struct LatencyStage {
    probe: Arc<dyn HostProbe>,
    targets: Vec<String>,
    per_target: Duration,
}

impl LatencyStage {
    pub fn new(probe: Arc<dyn HostProbe>, targets: Vec<String>, per_target: Duration) -> Self {
        Self {
            probe,
            targets,
            per_target,
        }
    }

    async fn ping(&self, target: &str) -> Result<f64> {
        timeout(self.per_target, self.probe.ping(target))
            .await
            .map_err(|_| ChronusError::Timeout {
                what: format!("ping {target}"),
                after_ms: self.per_target.as_millis() as u64,
            })?
    }
}

#[async_trait]
impl ProbeStage for LatencyStage {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn metrics(&self) -> &'static [&'static str] {
        METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let results = join_all(self.targets.iter().map(|t| self.ping(t))).await;

        let inst = out.instance_for(PING_LATENCY.name)?;
        for (target, result) in self.targets.iter().zip(results) {
            match result {
                Ok(ms) => inst
                    .set_label("destination", target)
                    .commit(ms)
                    .or_skip()?,
                Err(e) => tracing::warn!(destination = %target, error = %e, "ping failed"),
            }
        }
        Ok(())
    }
}
