//! Host metric catalog.
//!
//! `HOST_METRICS` is the closed list every host or guest registry is built
//! from. Add new definitions here; the registry rejects duplicate names at
//! startup.

use super::definition::MetricDef;

pub const SYSTEM_INFORMATION: MetricDef =
    MetricDef::gauge("system_information", "The host base information, value always 1")
        .with_labels(&["alive", "hostname", "os", "platform", "virt", "ip"]);

pub const SYSTEM_UP_TIME: MetricDef = MetricDef::gauge(
    "system_up_time",
    "represents the number of seconds since the UNIX Epoch of 1970-01-01 00:00:00 in UTC.",
);

pub const CPU_NUM: MetricDef = MetricDef::gauge(
    "cpu_num",
    "number of cpu/vcpu for calculate cpu usage percent",
);

pub const CPU_TIME: MetricDef = MetricDef::counter(
    "cpu_time",
    "time that processor spent in different modes (user,sys,total)",
)
.with_labels(&["mode"]);

pub const CPU_UTILIZATION: MetricDef = MetricDef::gauge(
    "cpu_utilization",
    "a float representing the current system-wide CPU utilization as a percentage",
);

pub const MEMORY_FREE_BYTES: MetricDef = MetricDef::gauge(
    "memory_free_bytes",
    "Free memory of swap memory, available memory of physical memory in bytes",
)
.with_labels(&["type"]);

pub const MEMORY_TOTAL_BYTES: MetricDef =
    MetricDef::gauge("memory_total_bytes", "Total memory of {physical, swap} in bytes")
        .with_labels(&["type"]);

pub const NETWORK_STATS: MetricDef = MetricDef::gauge(
    "network_stats",
    "information about each NIC (network interface card) installed on the system",
)
.with_labels(&["device", "up", "speed", "mtu"]);

pub const NETWORK_TRAFFICS: MetricDef = MetricDef::gauge(
    "network_traffics",
    "Network interface traffics, bytes in bytes | packets/err/drop in number of",
)
.with_labels(&["device", "type", "name"]);

pub const DISK_FREE_SPACE_BYTES: MetricDef =
    MetricDef::gauge("disk_free_space_bytes", "Filesystem free space size in bytes.")
        .with_labels(&["device", "name"]);

pub const DISK_TOTAL_SPACE_BYTES: MetricDef =
    MetricDef::gauge("disk_total_space_bytes", "Filesystem total space size in bytes.")
        .with_labels(&["device", "name"]);

pub const DISK_TRAFFIC_BYTES: MetricDef =
    MetricDef::gauge("disk_traffic_bytes", "Disk traffic in bytes, type{read/write}")
        .with_labels(&["disk", "type"]);

pub const DISK_TRAFFIC_COUNT: MetricDef = MetricDef::counter(
    "disk_traffic_count",
    "number of reads/writes for disk, type{read/write}",
)
.with_labels(&["disk", "type"]);

pub const DISK_TRAFFIC_TIME: MetricDef = MetricDef::counter(
    "disk_traffic_time",
    "reads/writes for disk time in ms, type{read/write}",
)
.with_labels(&["disk", "type"]);

pub const DISK_TRAFFIC_BUSY_TIME: MetricDef =
    MetricDef::counter("disk_traffic_busy_time", "busy time for disk in ms")
        .with_labels(&["disk"]);

pub const HARDWARE_CURRENT_TEMPERATURE: MetricDef = MetricDef::gauge(
    "hardware_current_temperature",
    "cpu/gpu/disk current temperature in °C",
)
.with_labels(&["device", "high", "critical"]);

pub const PING_LATENCY: MetricDef = MetricDef::gauge(
    "ping_latency",
    "avg latency of 3 ping from certain host in ms",
)
.with_labels(&["destination"]);

pub const DOMAIN_ALIVE: MetricDef = MetricDef::gauge(
    "domain_alive",
    "1 when the guest domain is running, 0 otherwise",
)
.with_labels(&["hypervisor"]);

pub const HOST_METRICS: &[MetricDef] = &[
    SYSTEM_INFORMATION,
    SYSTEM_UP_TIME,
    CPU_NUM,
    CPU_TIME,
    CPU_UTILIZATION,
    MEMORY_FREE_BYTES,
    MEMORY_TOTAL_BYTES,
    NETWORK_STATS,
    NETWORK_TRAFFICS,
    DISK_FREE_SPACE_BYTES,
    DISK_TOTAL_SPACE_BYTES,
    DISK_TRAFFIC_BYTES,
    DISK_TRAFFIC_COUNT,
    DISK_TRAFFIC_TIME,
    DISK_TRAFFIC_BUSY_TIME,
    HARDWARE_CURRENT_TEMPERATURE,
    PING_LATENCY,
];

/// Metrics collected for each virtualized guest; `host` is the domain name.
pub const GUEST_METRICS: &[MetricDef] = &[DOMAIN_ALIVE, SYSTEM_UP_TIME, CPU_NUM, CPU_TIME];
