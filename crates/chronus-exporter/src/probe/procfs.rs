//! procfs/sysfs readers and the pure parsers behind them.

use std::fs;
use std::path::Path;

use chronus_core::error::{ChronusError, Result};

use super::{CpuTimes, DiskIo, InterfaceStats, SensorReading};

/// Clock ticks per second used by `/proc/stat` on every mainstream kernel.
const USER_HZ: f64 = 100.0;
const SECTOR_BYTES: u64 = 512;

/// Parse the aggregate `cpu` line of `/proc/stat` into seconds per mode.
///
/// `system` folds in irq and softirq time, matching what psutil reports.
pub fn parse_proc_stat(s: &str) -> Result<CpuTimes> {
    let line = s
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| ChronusError::Collaborator("/proc/stat has no cpu line".into()))?;

    let ticks: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| ChronusError::Collaborator(format!("bad /proc/stat cpu line: {e}")))?;
    if ticks.len() < 4 {
        return Err(ChronusError::Collaborator("short /proc/stat cpu line".into()));
    }

    let field = |i: usize| ticks.get(i).copied().unwrap_or(0) as f64 / USER_HZ;
    Ok(CpuTimes {
        user: field(0),
        system: field(2) + field(5) + field(6),
        idle: field(3),
    })
}

/// Parse `/proc/diskstats`.
///
/// Lines with fewer than 14 columns (very old kernels) are skipped.
pub fn parse_diskstats(s: &str) -> Vec<DiskIo> {
    s.lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 14 {
                return None;
            }
            let n = |i: usize| cols[i].parse::<u64>().ok();
            Some(DiskIo {
                name: cols[2].to_string(),
                read_count: n(3)?,
                read_bytes: n(5)?.saturating_mul(SECTOR_BYTES),
                read_time_ms: n(6)?,
                write_count: n(7)?,
                write_bytes: n(9)?.saturating_mul(SECTOR_BYTES),
                write_time_ms: n(10)?,
                busy_time_ms: n(12)?,
            })
        })
        .collect()
}

/// Parse `lsblk -dno KNAME,TYPE` output, keeping whole disks only.
pub fn parse_lsblk(s: &str) -> Vec<String> {
    s.lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            match (cols.next(), cols.next()) {
                (Some(name), Some("disk")) => Some(name.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// hwmon values are millidegrees Celsius.
pub fn parse_millidegrees(s: &str) -> Option<f64> {
    s.trim().parse::<i64>().ok().map(|v| v as f64 / 1000.0)
}

pub fn read_proc_stat() -> Result<CpuTimes> {
    parse_proc_stat(&fs::read_to_string("/proc/stat")?)
}

pub fn read_diskstats() -> Result<Vec<DiskIo>> {
    Ok(parse_diskstats(&fs::read_to_string("/proc/diskstats")?))
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_u64(path: &Path) -> Option<u64> {
    read_trimmed(path)?.parse().ok()
}

/// Interface flags from `/sys/class/net`.
pub fn read_interfaces(root: &Path) -> Result<Vec<InterfaceStats>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let dir = entry.path();
        let device = entry.file_name().to_string_lossy().into_owned();

        // IFF_UP
        let up = read_trimmed(&dir.join("flags"))
            .and_then(|f| u64::from_str_radix(f.trim_start_matches("0x"), 16).ok())
            .map_or(false, |flags| flags & 0x1 != 0);
        // virtual links report EINVAL or -1
        let speed = read_trimmed(&dir.join("speed"))
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|s| *s > 0)
            .map_or(0, |s| s as u64);
        let mtu = read_u64(&dir.join("mtu")).unwrap_or(0);

        out.push(InterfaceStats { device, up, speed, mtu });
    }
    out.sort_by(|a, b| a.device.cmp(&b.device));
    Ok(out)
}

/// `(tx_dropped, rx_dropped)` for `device`.
pub fn read_drops(root: &Path, device: &str) -> (Option<u64>, Option<u64>) {
    let stats = root.join(device).join("statistics");
    (
        read_u64(&stats.join("tx_dropped")),
        read_u64(&stats.join("rx_dropped")),
    )
}

/// Temperature inputs of every `/sys/class/hwmon` chip.
pub fn read_hwmon(root: &Path) -> Result<Vec<SensorReading>> {
    let mut out = Vec::new();
    let mut chips: Vec<_> = fs::read_dir(root)?.filter_map(|e| e.ok()).collect();
    chips.sort_by_key(|e| e.file_name());

    for chip in chips {
        let dir = chip.path();
        let Some(group) = read_trimmed(&dir.join("name")) else {
            continue;
        };

        let mut inputs: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("temp") && n.ends_with("_input"))
            .collect();
        inputs.sort();

        for input in inputs {
            let prefix = input.trim_end_matches("_input");
            let Some(current) =
                read_trimmed(&dir.join(&input)).and_then(|s| parse_millidegrees(&s))
            else {
                continue;
            };
            let value = |suffix: &str| {
                read_trimmed(&dir.join(format!("{prefix}_{suffix}")))
                    .and_then(|s| parse_millidegrees(&s))
            };
            out.push(SensorReading {
                group: group.clone(),
                label: read_trimmed(&dir.join(format!("{prefix}_label"))).unwrap_or_default(),
                current,
                high: value("max"),
                critical: value("crit"),
            });
        }
    }
    Ok(out)
}
