//! Shared application state for the exporter.
//!
//! Startup errors (bad wiring, missing privilege) surface here as `Result`
//! so `main` can exit cleanly; per-pass errors never leave `export`.

use std::sync::Arc;

use tokio::sync::Mutex;

use chronus_core::error::Result;
use chronus_core::{Exposition, MetricRegistry};

use crate::collector::{virt, HostCollector, HostTarget, Virsh, VirtHostCollector};
use crate::config::ExporterConfig;
use crate::pipeline::{collaborator_budget, PassLimits};
use crate::probe::SystemProbe;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    host: HostCollector,
    virt: Option<VirtHostCollector>,
    /// One pass at a time; concurrent scrapes queue up.
    pass_lock: Mutex<()>,
}

impl AppState {
    pub fn new(cfg: ExporterConfig, host: HostCollector, virt: Option<VirtHostCollector>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                host,
                virt,
                pass_lock: Mutex::new(()),
            }),
        }
    }

    /// Wire the real host probe (and virsh when enabled).
    pub fn from_config(cfg: ExporterConfig, target: HostTarget) -> Result<Self> {
        let limits: PassLimits = (&cfg.collect).into();
        let call_timeout = collaborator_budget(cfg.collect.stage_timeout());
        let probe = Arc::new(SystemProbe::new(call_timeout, cfg.temperature.clone()));
        let host = HostCollector::new(probe, target.clone(), &cfg)?;

        let virt = if cfg.virt.enabled {
            let hv = Arc::new(Virsh::new(&cfg.virt, call_timeout));
            Some(VirtHostCollector::new(
                hv,
                target.host.clone(),
                limits,
                virt::current_euid(),
            )?)
        } else {
            None
        };

        tracing::info!(
            host = %target.host,
            ip = ?target.ip,
            virt = cfg.virt.enabled,
            parallel = cfg.collect.parallel,
            "collectors ready"
        );
        Ok(Self::new(cfg, host, virt))
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    /// Run one fresh pass (host, then every guest) and render it.
    pub async fn export(&self) -> Result<Exposition> {
        let _pass = self.inner.pass_lock.lock().await;

        let (host, _) = self.inner.host.collect().await?;

        let guests = match &self.inner.virt {
            Some(virt) => match virt.collect().await {
                Ok(guests) => guests,
                Err(e) => {
                    tracing::warn!(error = %e, "guest collection failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let mut registries: Vec<&MetricRegistry> = Vec::with_capacity(1 + guests.len());
        registries.push(&host);
        registries.extend(guests.iter().map(|(_, registry, _)| registry));
        Ok(MetricRegistry::render_all(&registries))
    }
}
