use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use chronus_core::error::{ChronusError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub host: HostSection,

    #[serde(default)]
    pub collect: CollectSection,

    #[serde(default)]
    pub temperature: TemperatureSection,

    #[serde(default)]
    pub virt: VirtSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterSection::default(),
            host: HostSection::default(),
            collect: CollectSection::default(),
            temperature: TemperatureSection::default(),
            virt: VirtSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChronusError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.exporter.validate()?;
        self.collect.validate()?;
        self.temperature.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !self.path.starts_with('/') || self.path == "/healthz" {
            return Err(ChronusError::Config(
                "exporter.path must start with '/' and must not be /healthz".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            ChronusError::Config(format!(
                "exporter.listen must be a valid SocketAddr, got {:?}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8999".into()
}
fn default_path() -> String {
    "/metrics".into()
}

/// Host identity overrides. Unset values are discovered locally.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default)]
    pub ping_targets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectSection {
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,

    #[serde(default = "default_pass_deadline_ms")]
    pub pass_deadline_ms: u64,

    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub disabled_stages: Vec<String>,
}

impl Default for CollectSection {
    fn default() -> Self {
        Self {
            stage_timeout_ms: default_stage_timeout_ms(),
            pass_deadline_ms: default_pass_deadline_ms(),
            parallel: false,
            disabled_stages: Vec::new(),
        }
    }
}

impl CollectSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.stage_timeout_ms) {
            return Err(ChronusError::Config(
                "collect.stage_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.pass_deadline_ms < self.stage_timeout_ms {
            return Err(ChronusError::Config(
                "collect.pass_deadline_ms must not be less than stage_timeout_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    pub fn pass_deadline(&self) -> Duration {
        Duration::from_millis(self.pass_deadline_ms)
    }

    pub fn is_disabled(&self, stage: &str) -> bool {
        self.disabled_stages.iter().any(|s| s == stage)
    }
}

fn default_stage_timeout_ms() -> u64 {
    5000
}
fn default_pass_deadline_ms() -> u64 {
    15000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemperatureSection {
    /// hddtemp daemon address; empty disables the hddtemp stage.
    #[serde(default = "default_hddtemp_addr")]
    pub hddtemp_addr: String,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default = "default_ceiling_celsius")]
    pub ceiling_celsius: f64,
}

impl Default for TemperatureSection {
    fn default() -> Self {
        Self {
            hddtemp_addr: default_hddtemp_addr(),
            max_bytes: default_max_bytes(),
            ceiling_celsius: default_ceiling_celsius(),
        }
    }
}

impl TemperatureSection {
    pub fn validate(&self) -> Result<()> {
        if !(512..=1 << 20).contains(&self.max_bytes) {
            return Err(ChronusError::Config(
                "temperature.max_bytes must be between 512 and 1048576".into(),
            ));
        }
        if !(self.ceiling_celsius > 0.0 && self.ceiling_celsius <= 200.0) {
            return Err(ChronusError::Config(
                "temperature.ceiling_celsius must be in (0, 200]".into(),
            ));
        }
        Ok(())
    }

    pub fn hddtemp_enabled(&self) -> bool {
        !self.hddtemp_addr.is_empty()
    }
}

fn default_hddtemp_addr() -> String {
    "127.0.0.1:7634".into()
}
fn default_max_bytes() -> usize {
    65536
}
fn default_ceiling_celsius() -> f64 {
    90.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_virsh")]
    pub virsh: String,

    #[serde(default = "default_uri")]
    pub uri: String,
}

impl Default for VirtSection {
    fn default() -> Self {
        Self {
            enabled: false,
            virsh: default_virsh(),
            uri: default_uri(),
        }
    }
}

fn default_virsh() -> String {
    "virsh".into()
}
fn default_uri() -> String {
    "qemu:///system".into()
}
