//! OS/hardware probe collaborators.
//!
//! Everything here is a thin wrapper over `sysinfo`, procfs/sysfs, a shell
//! utility or a local daemon. Stages only see the snapshot types below, so a
//! fake [`HostProbe`] can stand in for the real host in tests.
//!
//! Every call is bounded: blocking reads run on the blocking pool and
//! subprocess/socket calls carry their own timeout.

pub mod hddtemp;
pub mod ping;
pub mod procfs;
pub mod system;

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use chronus_core::error::{ChronusError, Result};

pub use system::SystemProbe;

/// Host identity reported by the liveness pre-check.
#[derive(Debug, Clone, PartialEq)]
pub struct HostIdentity {
    pub hostname: String,
    pub os: String,
    pub platform: String,
    /// Seconds since the UNIX epoch.
    pub boot_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuSnapshot {
    pub logical_cores: usize,
    /// System-wide utilization since the previous refresh, in percent.
    pub utilization: f64,
    /// Cumulative seconds per mode.
    pub times: CpuTimes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemorySnapshot {
    pub total: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemUsage {
    pub device: String,
    pub mount_point: String,
    pub free: u64,
    pub total: u64,
}

/// Cumulative I/O counters of one block device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskIo {
    pub name: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
    pub busy_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceStats {
    pub device: String,
    pub up: bool,
    /// Link speed in Mbit/s, 0 when unknown.
    pub speed: u64,
    pub mtu: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceTraffic {
    pub device: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub err_out: u64,
    pub err_in: u64,
    pub drop_out: Option<u64>,
    pub drop_in: Option<u64>,
}

/// One hwmon temperature input.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Sensor group (hwmon chip name, e.g. `k10temp`, `amdgpu`, `nvme`).
    pub group: String,
    pub label: String,
    pub current: f64,
    pub high: Option<f64>,
    pub critical: Option<f64>,
}

/// One drive reported by the hddtemp daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct HddReading {
    pub device: String,
    pub label: String,
    pub celsius: f64,
}

/// Read-only view of the local host.
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn identity(&self) -> Result<HostIdentity>;
    async fn cpu(&self) -> Result<CpuSnapshot>;
    async fn memory(&self) -> Result<MemorySnapshot>;
    async fn filesystems(&self) -> Result<Vec<FilesystemUsage>>;
    async fn disk_io(&self) -> Result<Vec<DiskIo>>;
    /// Kernel names of whole physical disks (partitions excluded).
    async fn physical_disks(&self) -> Result<Vec<String>>;
    async fn interfaces(&self) -> Result<Vec<InterfaceStats>>;
    async fn traffics(&self) -> Result<Vec<InterfaceTraffic>>;
    async fn sensors(&self) -> Result<Vec<SensorReading>>;
    async fn hdd_temperatures(&self) -> Result<Vec<HddReading>>;
    /// Average round-trip time to `target` in milliseconds.
    async fn ping(&self, target: &str) -> Result<f64>;
}

/// Run a blocking probe call on the blocking pool.
pub async fn blocking<T, F>(what: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ChronusError::Internal(format!("{what} probe task failed: {e}")))?
}

/// Run a subprocess with a hard timeout and return its stdout.
///
/// The child is killed when the timeout fires. Non-zero exit is a
/// collaborator failure carrying the child's stderr.
pub async fn run_command(program: &str, args: &[&str], limit: Duration) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    let output = timeout(limit, cmd.output())
        .await
        .map_err(|_| ChronusError::Timeout {
            what: program.to_string(),
            after_ms: limit.as_millis() as u64,
        })?
        .map_err(|e| ChronusError::Collaborator(format!("spawn {program} failed: {e}")))?;

    if !output.status.success() {
        return Err(ChronusError::Collaborator(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
