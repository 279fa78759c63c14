use std::sync::Arc;

use async_trait::async_trait;

use chronus_core::error::Result;
use chronus_core::metric::catalog::{HOST_METRICS, SYSTEM_INFORMATION, SYSTEM_UP_TIME};
use chronus_core::MetricRegistry;

use crate::config::{ExporterConfig, HostSection};
use crate::pipeline::{
    CollectionPipeline, LivenessCheck, PassLimits, PassReport, ProbeStage, SampleResultExt,
};
use crate::probe::{system, HostProbe};
use crate::stages;

const LIVENESS_METRICS: &[&str] = &[SYSTEM_INFORMATION.name, SYSTEM_UP_TIME.name];

/// Identity the host's samples are labeled with.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTarget {
    pub host: String,
    /// `None` when no address could be discovered; `system_information` is
    /// then left out rather than labeled with a made-up address.
    pub ip: Option<String>,
}

impl HostTarget {
    /// Config overrides first, local discovery second.
    pub fn resolve(cfg: &HostSection) -> Self {
        let host = cfg
            .name
            .clone()
            .filter(|h| !h.is_empty())
            .or_else(system::local_hostname)
            .unwrap_or_else(|| "localhost".into());
        let ip = cfg.ip.clone().filter(|ip| !ip.is_empty()).or_else(system::default_ip);
        Self { host, ip }
    }
}

/// The local host is up whenever this process runs; the check records its
/// identity and boot time.
pub struct HostLiveness {
    probe: Arc<dyn HostProbe>,
    target: HostTarget,
}

impl HostLiveness {
    pub fn new(probe: Arc<dyn HostProbe>, target: HostTarget) -> Self {
        Self { probe, target }
    }
}

#[async_trait]
impl LivenessCheck for HostLiveness {
    fn metrics(&self) -> &'static [&'static str] {
        LIVENESS_METRICS
    }

    async fn check(&self, out: &mut MetricRegistry) -> Result<bool> {
        let id = self.probe.identity().await?;

        let info = out.instance_for(SYSTEM_INFORMATION.name)?;
        info.set_label("alive", 1)
            .set_label("hostname", &self.target.host)
            .set_label("os", &id.os)
            .set_label("platform", &id.platform)
            .set_label("virt", 0);
        if let Some(ip) = &self.target.ip {
            info.set_label("ip", ip);
        }
        info.commit(1u32).or_skip()?;

        out.instance_for(SYSTEM_UP_TIME.name)?
            .value(id.boot_time)
            .or_skip()?;
        Ok(true)
    }
}

/// One fresh pass per call against the local host.
pub struct HostCollector {
    probe: Arc<dyn HostProbe>,
    target: HostTarget,
    stages: Vec<Arc<dyn ProbeStage>>,
    limits: PassLimits,
}

impl HostCollector {
    pub fn new(probe: Arc<dyn HostProbe>, target: HostTarget, cfg: &ExporterConfig) -> Result<Self> {
        let stages = stages::host_stages(Arc::clone(&probe), cfg);
        Self::from_parts(probe, target, stages, (&cfg.collect).into())
    }

    /// Wire a collector from explicit parts.
    ///
    /// Fails when a stage declares a metric the host catalog does not know.
    pub fn from_parts(
        probe: Arc<dyn HostProbe>,
        target: HostTarget,
        stages: Vec<Arc<dyn ProbeStage>>,
        limits: PassLimits,
    ) -> Result<Self> {
        let this = Self {
            probe,
            target,
            stages,
            limits,
        };
        this.pipeline().validate(&this.registry()?)?;
        Ok(this)
    }

    pub fn target(&self) -> &HostTarget {
        &self.target
    }

    /// Empty registry for one pass.
    pub fn registry(&self) -> Result<MetricRegistry> {
        MetricRegistry::new(HOST_METRICS, [("host", self.target.host.as_str())])
    }

    pub fn pipeline(&self) -> CollectionPipeline {
        let liveness = Arc::new(HostLiveness::new(
            Arc::clone(&self.probe),
            self.target.clone(),
        ));
        CollectionPipeline::new(liveness, self.limits).with_stages(self.stages.iter().cloned())
    }

    /// Run one full pass and hand back the populated registry.
    pub async fn collect(&self) -> Result<(MetricRegistry, PassReport)> {
        let mut registry = self.registry()?;
        let report = self.pipeline().run(&mut registry).await;
        tracing::debug!(
            host = %self.target.host,
            state = ?report.state,
            records = registry.record_count(),
            failed_stages = report.failed(),
            "host pass finished"
        );
        Ok((registry, report))
    }
}
