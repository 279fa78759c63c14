//! Guest domain collection against a fake hypervisor.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use chronus_core::error::{ChronusError, Result};
use chronus_core::{ErrorClass, MetricRegistry};
use chronus_exporter::collector::virt::ensure_root;
use chronus_exporter::collector::{DomainCollector, DomainCpuStats, Hypervisor, VirtHostCollector};
use chronus_exporter::pipeline::{PassLimits, PipelineState};

/// `web` is running, `db` is shut off, `broken` runs without a guest agent.
struct FakeHypervisor;

#[async_trait]
impl Hypervisor for FakeHypervisor {
    async fn domains(&self) -> Result<Vec<String>> {
        Ok(vec!["web".into(), "db".into(), "broken".into()])
    }

    async fn is_active(&self, domain: &str) -> Result<bool> {
        Ok(domain != "db")
    }

    async fn cpu_stats(&self, _domain: &str) -> Result<DomainCpuStats> {
        Ok(DomainCpuStats {
            cpu_time: 120.5,
            user_time: 20.0,
            system_time: 40.0,
        })
    }

    async fn max_vcpus(&self, _domain: &str) -> Result<u32> {
        Ok(4)
    }

    async fn guest_boot_time(&self, domain: &str) -> Result<i64> {
        match domain {
            "web" => Ok(1_700_000_000),
            _ => Err(ChronusError::Collaborator("guest agent is not connected".into())),
        }
    }
}

fn hv() -> Arc<dyn Hypervisor> {
    Arc::new(FakeHypervisor)
}

/// Every domain is running; selected calls stall for a fixed time.
struct StallingHypervisor {
    domains: usize,
    agent_delay: Duration,
    cpu_delay: Duration,
}

#[async_trait]
impl Hypervisor for StallingHypervisor {
    async fn domains(&self) -> Result<Vec<String>> {
        Ok((0..self.domains).map(|i| format!("vm{i}")).collect())
    }

    async fn is_active(&self, _domain: &str) -> Result<bool> {
        Ok(true)
    }

    async fn cpu_stats(&self, _domain: &str) -> Result<DomainCpuStats> {
        tokio::time::sleep(self.cpu_delay).await;
        Ok(DomainCpuStats {
            cpu_time: 1.0,
            user_time: 0.5,
            system_time: 0.5,
        })
    }

    async fn max_vcpus(&self, _domain: &str) -> Result<u32> {
        Ok(2)
    }

    async fn guest_boot_time(&self, _domain: &str) -> Result<i64> {
        tokio::time::sleep(self.agent_delay).await;
        Ok(1_700_000_000)
    }
}

#[test]
fn non_root_is_rejected_at_startup() {
    let err = ensure_root(1000).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Startup);
    assert!(err.class().is_fatal());
    assert!(ensure_root(0).is_ok());

    let err = VirtHostCollector::new(hv(), "kvm1".into(), PassLimits::default(), 1000)
        .err()
        .expect("must fail");
    assert!(matches!(err, ChronusError::Privilege(_)));
}

#[tokio::test]
async fn running_domain_reports_cpu() {
    let collector = DomainCollector::new(hv(), "web".into(), "kvm1".into(), PassLimits::default());
    let (registry, report) = collector.collect().await.unwrap();
    assert_eq!(report.state, PipelineState::Done);

    let text = registry.render().text;
    assert!(text.contains("domain_alive{hypervisor=\"kvm1\",host=\"web\"} 1\n"));
    assert!(text.contains("system_up_time{host=\"web\"} 1700000000\n"));
    assert!(text.contains("cpu_time{mode=\"total\",host=\"web\"} 120.5\n"));
    assert!(text.contains("cpu_time{mode=\"user\",host=\"web\"} 20\n"));
    assert!(text.contains("cpu_time{mode=\"sys\",host=\"web\"} 40\n"));
    assert!(text.contains("cpu_num{host=\"web\"} 4\n"));
}

#[tokio::test]
async fn shut_off_domain_only_reports_liveness() {
    let collector = DomainCollector::new(hv(), "db".into(), "kvm1".into(), PassLimits::default());
    let (registry, report) = collector.collect().await.unwrap();
    assert_eq!(report.state, PipelineState::Aborted);

    let text = registry.render().text;
    assert!(text.contains("domain_alive{hypervisor=\"kvm1\",host=\"db\"} 0\n"));
    assert!(!text.contains("cpu_time"));
    assert!(!text.contains("system_up_time{"));
}

#[tokio::test]
async fn missing_guest_agent_keeps_other_samples() {
    let collector =
        DomainCollector::new(hv(), "broken".into(), "kvm1".into(), PassLimits::default());
    let (registry, report) = collector.collect().await.unwrap();
    assert_eq!(report.state, PipelineState::Done);
    assert!(registry.get("system_up_time").unwrap().is_empty());
    assert_eq!(registry.get("cpu_time").unwrap().len(), 3);
}

#[tokio::test]
async fn virt_host_runs_one_pass_per_domain() {
    let virt = VirtHostCollector::new(hv(), "kvm1".into(), PassLimits::default(), 0).unwrap();
    let guests = virt.collect().await.unwrap();

    let names: Vec<_> = guests.iter().map(|(d, _, _)| d.as_str()).collect();
    assert_eq!(names, vec!["web", "db", "broken"]);

    let registries: Vec<&MetricRegistry> = guests.iter().map(|(_, r, _)| r).collect();
    let text = MetricRegistry::render_all(&registries).text;
    assert_eq!(text.matches("# TYPE cpu_time counter\n").count(), 1);
    assert_eq!(text.matches("domain_alive{").count(), 3);
}

#[tokio::test]
async fn stalled_guest_agent_keeps_liveness_and_cpu() {
    let stage = Duration::from_millis(200);
    let hv = Arc::new(StallingHypervisor {
        domains: 1,
        agent_delay: stage.mul_f64(1.3),
        cpu_delay: Duration::ZERO,
    });
    let limits = PassLimits {
        stage_timeout: stage,
        pass_deadline: Duration::from_secs(2),
        parallel: false,
    };

    let collector = DomainCollector::new(hv, "vm0".into(), "kvm1".into(), limits);
    let (registry, report) = collector.collect().await.unwrap();
    assert_eq!(report.state, PipelineState::Done);

    let text = registry.render().text;
    assert!(text.contains("domain_alive{hypervisor=\"kvm1\",host=\"vm0\"} 1\n"));
    assert!(!text.contains("system_up_time{"));
    assert_eq!(registry.get("cpu_time").unwrap().len(), 3);
}

#[tokio::test]
async fn virt_section_shares_one_deadline() {
    let hv = Arc::new(StallingHypervisor {
        domains: 10,
        agent_delay: Duration::ZERO,
        cpu_delay: Duration::from_millis(80),
    });
    let limits = PassLimits {
        stage_timeout: Duration::from_millis(100),
        pass_deadline: Duration::from_millis(250),
        parallel: false,
    };
    let virt = VirtHostCollector::new(hv, "kvm1".into(), limits, 0).unwrap();

    let started = Instant::now();
    let guests = virt.collect().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!guests.is_empty());
    assert!(guests.len() < 10, "collected {} domains", guests.len());
    assert_eq!(guests[0].0, "vm0");
}
