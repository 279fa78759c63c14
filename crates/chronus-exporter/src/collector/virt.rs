//! Per-guest collection for virtualization hosts.
//!
//! Each guest domain gets its own registry, labeled `host=<domain>`, and runs
//! the same pre-check/stages protocol as the local host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout, Instant};

use chronus_core::error::{ChronusError, Result};
use chronus_core::metric::catalog::{CPU_NUM, CPU_TIME, DOMAIN_ALIVE, GUEST_METRICS, SYSTEM_UP_TIME};
use chronus_core::MetricRegistry;

use super::virsh::Hypervisor;
use crate::pipeline::{
    collaborator_budget, CollectionPipeline, LivenessCheck, PassLimits, PassReport, ProbeStage,
    SampleResultExt,
};

const LIVENESS_METRICS: &[&str] = &[DOMAIN_ALIVE.name, SYSTEM_UP_TIME.name];
const CPU_METRICS: &[&str] = &[CPU_TIME.name, CPU_NUM.name];

/// Guest-agent and libvirt access need root.
pub fn ensure_root(euid: u32) -> Result<()> {
    if euid != 0 {
        return Err(ChronusError::Privilege(
            "virtualization collection needs root privileges, try again with sudo".into(),
        ));
    }
    Ok(())
}

pub fn current_euid() -> u32 {
    nix::unistd::geteuid().as_raw()
}

/// Domain running? Records `domain_alive` either way and, when running, the
/// guest boot time. An unreachable or slow guest agent only drops the boot
/// time; `agent_timeout` must stay below the pre-check budget.
pub struct DomainLiveness {
    hv: Arc<dyn Hypervisor>,
    domain: String,
    hypervisor_host: String,
    agent_timeout: Duration,
}

impl DomainLiveness {
    pub fn new(
        hv: Arc<dyn Hypervisor>,
        domain: String,
        hypervisor_host: String,
        agent_timeout: Duration,
    ) -> Self {
        Self {
            hv,
            domain,
            hypervisor_host,
            agent_timeout,
        }
    }

    async fn boot_time(&self) -> Result<i64> {
        timeout(self.agent_timeout, self.hv.guest_boot_time(&self.domain))
            .await
            .map_err(|_| ChronusError::Timeout {
                what: format!("guest agent on {}", self.domain),
                after_ms: self.agent_timeout.as_millis() as u64,
            })?
    }
}

#[async_trait]
impl LivenessCheck for DomainLiveness {
    fn metrics(&self) -> &'static [&'static str] {
        LIVENESS_METRICS
    }

    async fn check(&self, out: &mut MetricRegistry) -> Result<bool> {
        let alive = self.hv.is_active(&self.domain).await?;
        out.instance_for(DOMAIN_ALIVE.name)?
            .set_label("hypervisor", &self.hypervisor_host)
            .commit(u32::from(alive))
            .or_skip()?;

        if alive {
            match self.boot_time().await {
                Ok(boot) => out.instance_for(SYSTEM_UP_TIME.name)?.value(boot).or_skip()?,
                Err(e) => {
                    tracing::warn!(domain = %self.domain, error = %e, "guest boot time unavailable")
                }
            }
        }
        Ok(alive)
    }
}

/// Guest CPU time per mode and vCPU count.
pub struct DomainCpuStage {
    hv: Arc<dyn Hypervisor>,
    domain: String,
}

impl DomainCpuStage {
    pub fn new(hv: Arc<dyn Hypervisor>, domain: String) -> Self {
        Self { hv, domain }
    }
}

#[async_trait]
impl ProbeStage for DomainCpuStage {
    fn name(&self) -> &'static str {
        "domain_cpu"
    }

    fn metrics(&self) -> &'static [&'static str] {
        CPU_METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let stats = self.hv.cpu_stats(&self.domain).await?;
        let vcpus = self.hv.max_vcpus(&self.domain).await?;

        let times = out.instance_for(CPU_TIME.name)?;
        for (mode, secs) in [
            ("total", stats.cpu_time),
            ("user", stats.user_time),
            ("sys", stats.system_time),
        ] {
            times.set_label("mode", mode).commit(secs).or_skip()?;
        }

        out.instance_for(CPU_NUM.name)?.value(vcpus).or_skip()
    }
}

/// One pass for one guest.
pub struct DomainCollector {
    hv: Arc<dyn Hypervisor>,
    domain: String,
    hypervisor_host: String,
    limits: PassLimits,
}

impl DomainCollector {
    pub fn new(
        hv: Arc<dyn Hypervisor>,
        domain: String,
        hypervisor_host: String,
        limits: PassLimits,
    ) -> Self {
        Self {
            hv,
            domain,
            hypervisor_host,
            limits,
        }
    }

    pub fn registry(&self) -> Result<MetricRegistry> {
        MetricRegistry::new(GUEST_METRICS, [("host", self.domain.as_str())])
    }

    pub fn pipeline(&self) -> CollectionPipeline {
        let liveness = Arc::new(DomainLiveness::new(
            Arc::clone(&self.hv),
            self.domain.clone(),
            self.hypervisor_host.clone(),
            collaborator_budget(self.limits.check_budget()),
        ));
        CollectionPipeline::new(liveness, self.limits).with_stage(Arc::new(DomainCpuStage::new(
            Arc::clone(&self.hv),
            self.domain.clone(),
        )))
    }

    pub async fn collect(&self) -> Result<(MetricRegistry, PassReport)> {
        let mut registry = self.registry()?;
        let report = self.pipeline().run(&mut registry).await;
        tracing::debug!(domain = %self.domain, state = ?report.state, "domain pass finished");
        Ok((registry, report))
    }
}

/// Runs a [`DomainCollector`] pass for every guest the hypervisor reports.
pub struct VirtHostCollector {
    hv: Arc<dyn Hypervisor>,
    hypervisor_host: String,
    limits: PassLimits,
}

impl VirtHostCollector {
    /// Fails without root privileges.
    pub fn new(
        hv: Arc<dyn Hypervisor>,
        hypervisor_host: String,
        limits: PassLimits,
        euid: u32,
    ) -> Result<Self> {
        ensure_root(euid)?;
        let this = Self {
            hv,
            hypervisor_host,
            limits,
        };
        // wiring check against the guest catalog
        let probe = DomainCollector::new(
            Arc::clone(&this.hv),
            "wiring-check".into(),
            this.hypervisor_host.clone(),
            limits,
        );
        probe.pipeline().validate(&probe.registry()?)?;
        Ok(this)
    }

    /// One pass per domain, in the order the hypervisor lists them.
    ///
    /// All guests share one pass deadline. Domains reached after it are left
    /// out of this scrape.
    pub async fn collect(&self) -> Result<Vec<(String, MetricRegistry, PassReport)>> {
        let deadline = Instant::now() + self.limits.pass_deadline;
        let domains = timeout(self.limits.stage_timeout, self.hv.domains())
            .await
            .map_err(|_| ChronusError::Timeout {
                what: "domain listing".into(),
                after_ms: self.limits.stage_timeout.as_millis() as u64,
            })??;

        let total = domains.len();
        let mut out = Vec::with_capacity(total);
        for (i, domain) in domains.into_iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(skipped = total - i, "virt pass deadline reached, domains skipped");
                break;
            }
            let limits = PassLimits {
                pass_deadline: remaining,
                ..self.limits
            };
            let collector = DomainCollector::new(
                Arc::clone(&self.hv),
                domain.clone(),
                self.hypervisor_host.clone(),
                limits,
            );
            match collector.collect().await {
                Ok((registry, report)) => out.push((domain, registry, report)),
                Err(e) => tracing::warn!(domain = %domain, error = %e, "domain pass failed"),
            }
        }
        Ok(out)
    }
}
