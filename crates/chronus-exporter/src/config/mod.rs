//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use chronus_core::error::{ChronusError, Result};

pub use schema::{
    CollectSection, ExporterConfig, ExporterSection, HostSection, TemperatureSection, VirtSection,
};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ExporterConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| ChronusError::Config(format!("read config {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| ChronusError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load `path` when it exists, fall back to built-in defaults otherwise.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ExporterConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_from_file(path)
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Ok(ExporterConfig::default())
    }
}
