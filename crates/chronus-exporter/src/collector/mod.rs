//! Collectors: a registry, a liveness check and a stage list per target.
//!
//! The host collector runs one pass against the local machine; the virt
//! collector repeats the same protocol once per guest domain.

pub mod host;
pub mod virsh;
pub mod virt;

pub use host::{HostCollector, HostLiveness, HostTarget};
pub use virsh::{DomainCpuStats, Hypervisor, Virsh};
pub use virt::{DomainCollector, DomainCpuStage, DomainLiveness, VirtHostCollector};
