//! Command line interface.
//!
//! ```text
//! chronus-exporter                 # serve /metrics (default)
//! chronus-exporter once            # one pass, print to stdout
//! chronus-exporter --virt once     # include guest domains (root only)
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use chronus_core::error::Result;

use crate::config::ExporterConfig;

pub const DEFAULT_CONFIG_FILE: &str = "chronus.yaml";

#[derive(Debug, Parser)]
#[command(name = "chronus-exporter")]
#[command(about = "Host and guest metrics exporter for Prometheus")]
#[command(version)]
pub struct Cli {
    /// Path to the YAML config file (optional)
    #[arg(long, short, env = "CHRONUS_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override the `host` label
    #[arg(long)]
    pub host: Option<String>,

    /// Override the reported IP address
    #[arg(long)]
    pub ip: Option<String>,

    /// Override exporter.listen
    #[arg(long)]
    pub listen: Option<String>,

    /// Also collect libvirt guest domains (needs root)
    #[arg(long)]
    pub virt: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Serve the metrics endpoint
    Serve,
    /// Run one collection pass and print it
    Once,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    /// Apply command line overrides on top of the file config.
    pub fn apply(&self, cfg: &mut ExporterConfig) -> Result<()> {
        if let Some(host) = &self.host {
            cfg.host.name = Some(host.clone());
        }
        if let Some(ip) = &self.ip {
            cfg.host.ip = Some(ip.clone());
        }
        if let Some(listen) = &self.listen {
            cfg.exporter.listen = listen.clone();
        }
        if self.virt {
            cfg.virt.enabled = true;
        }
        cfg.validate()
    }
}
