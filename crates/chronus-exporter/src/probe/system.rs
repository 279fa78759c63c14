//! The real host probe.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use get_if_addrs::get_if_addrs;
use sysinfo::{Disks, Networks, System};

use chronus_core::error::{ChronusError, Result};

use super::{
    blocking, hddtemp, ping, procfs, run_command, CpuSnapshot, DiskIo, FilesystemUsage,
    HddReading, HostIdentity, HostProbe, InterfaceStats, InterfaceTraffic, MemorySnapshot,
    SensorReading,
};
use crate::config::TemperatureSection;

const SYS_NET: &str = "/sys/class/net";
const SYS_HWMON: &str = "/sys/class/hwmon";

/// `HostProbe` backed by `sysinfo`, procfs/sysfs, `lsblk`, `ping` and hddtemp.
///
/// The `System` handle is kept across passes so CPU utilization is measured
/// between two consecutive scrapes.
pub struct SystemProbe {
    sys: Arc<Mutex<System>>,
    call_timeout: Duration,
    temperature: TemperatureSection,
    net_root: PathBuf,
    hwmon_root: PathBuf,
}

impl SystemProbe {
    pub fn new(call_timeout: Duration, temperature: TemperatureSection) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            call_timeout,
            temperature,
            net_root: PathBuf::from(SYS_NET),
            hwmon_root: PathBuf::from(SYS_HWMON),
        }
    }

    fn with_sys<T, F>(sys: &Mutex<System>, f: F) -> Result<T>
    where
        F: FnOnce(&mut System) -> T,
    {
        let mut guard = sys
            .lock()
            .map_err(|_| ChronusError::Internal("sysinfo handle poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

/// `platform.platform()`-style string, e.g. `Linux-6.1.0-amd64-x86_64`.
pub fn platform_string() -> String {
    format!(
        "{}-{}-{}",
        System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        System::kernel_version().unwrap_or_default(),
        std::env::consts::ARCH
    )
}

pub fn local_hostname() -> Option<String> {
    System::host_name().filter(|h| !h.is_empty())
}

/// IPv4 address of the first interface whose name starts with `e`
/// (eth0, enp3s0, eno1, ...).
pub fn default_ip() -> Option<String> {
    let ifaces = get_if_addrs().ok()?;
    select_default_ipv4(ifaces.iter().map(|iface| (iface.name.as_str(), iface.ip())))
}

/// Interfaces are ranked by name; the first `e*` one carrying an IPv4
/// address wins.
pub fn select_default_ipv4<'a>(addrs: impl IntoIterator<Item = (&'a str, IpAddr)>) -> Option<String> {
    let mut candidates: Vec<(&str, IpAddr)> = addrs
        .into_iter()
        .filter(|(name, ip)| name.starts_with('e') && ip.is_ipv4())
        .collect();
    // stable sort keeps the kernel's address order within one interface
    candidates.sort_by_key(|(name, _)| *name);
    candidates.first().map(|(_, ip)| ip.to_string())
}

#[async_trait]
impl HostProbe for SystemProbe {
    async fn identity(&self) -> Result<HostIdentity> {
        blocking("identity", || {
            Ok(HostIdentity {
                hostname: local_hostname().unwrap_or_else(|| "localhost".into()),
                os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
                platform: platform_string(),
                boot_time: System::boot_time(),
            })
        })
        .await
    }

    async fn cpu(&self) -> Result<CpuSnapshot> {
        let sys = Arc::clone(&self.sys);
        blocking("cpu", move || {
            let (logical_cores, utilization) = Self::with_sys(&sys, |s| {
                s.refresh_cpu();
                (s.cpus().len(), s.global_cpu_info().cpu_usage() as f64)
            })?;
            Ok(CpuSnapshot {
                logical_cores,
                utilization,
                times: procfs::read_proc_stat()?,
            })
        })
        .await
    }

    async fn memory(&self) -> Result<MemorySnapshot> {
        let sys = Arc::clone(&self.sys);
        blocking("memory", move || {
            Self::with_sys(&sys, |s| {
                s.refresh_memory();
                MemorySnapshot {
                    total: s.total_memory(),
                    available: s.available_memory(),
                    swap_total: s.total_swap(),
                    swap_free: s.free_swap(),
                }
            })
        })
        .await
    }

    async fn filesystems(&self) -> Result<Vec<FilesystemUsage>> {
        blocking("filesystems", || {
            let disks = Disks::new_with_refreshed_list();
            Ok(disks
                .list()
                .iter()
                .map(|d| FilesystemUsage {
                    device: d.name().to_string_lossy().into_owned(),
                    mount_point: d.mount_point().to_string_lossy().into_owned(),
                    free: d.available_space(),
                    total: d.total_space(),
                })
                .collect())
        })
        .await
    }

    async fn disk_io(&self) -> Result<Vec<DiskIo>> {
        blocking("diskstats", procfs::read_diskstats).await
    }

    async fn physical_disks(&self) -> Result<Vec<String>> {
        let out = run_command("lsblk", &["-dno", "KNAME,TYPE"], self.call_timeout).await?;
        Ok(procfs::parse_lsblk(&out))
    }

    async fn interfaces(&self) -> Result<Vec<InterfaceStats>> {
        let root = self.net_root.clone();
        blocking("interfaces", move || procfs::read_interfaces(&root)).await
    }

    async fn traffics(&self) -> Result<Vec<InterfaceTraffic>> {
        let root = self.net_root.clone();
        blocking("traffics", move || {
            let networks = Networks::new_with_refreshed_list();
            let mut out: Vec<InterfaceTraffic> = (&networks)
                .into_iter()
                .map(|(device, data)| {
                    let (drop_out, drop_in) = procfs::read_drops(&root, device);
                    InterfaceTraffic {
                        device: device.clone(),
                        bytes_sent: data.total_transmitted(),
                        bytes_recv: data.total_received(),
                        packets_sent: data.total_packets_transmitted(),
                        packets_recv: data.total_packets_received(),
                        err_out: data.total_errors_on_transmitted(),
                        err_in: data.total_errors_on_received(),
                        drop_out,
                        drop_in,
                    }
                })
                .collect();
            out.sort_by(|a, b| a.device.cmp(&b.device));
            Ok(out)
        })
        .await
    }

    async fn sensors(&self) -> Result<Vec<SensorReading>> {
        let root = self.hwmon_root.clone();
        blocking("hwmon", move || procfs::read_hwmon(&root)).await
    }

    async fn hdd_temperatures(&self) -> Result<Vec<HddReading>> {
        let reply = hddtemp::fetch(
            &self.temperature.hddtemp_addr,
            self.call_timeout,
            self.temperature.max_bytes,
        )
        .await?;
        Ok(hddtemp::parse(&reply))
    }

    async fn ping(&self, target: &str) -> Result<f64> {
        ping::average_rtt_ms(target, self.call_timeout).await
    }
}
