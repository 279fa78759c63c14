use std::sync::Arc;

use async_trait::async_trait;

use chronus_core::error::Result;
use chronus_core::metric::catalog::{
    DISK_FREE_SPACE_BYTES, DISK_TOTAL_SPACE_BYTES, DISK_TRAFFIC_BUSY_TIME, DISK_TRAFFIC_BYTES,
    DISK_TRAFFIC_COUNT, DISK_TRAFFIC_TIME,
};
use chronus_core::MetricRegistry;

use crate::pipeline::{ProbeStage, SampleResultExt};
use crate::probe::HostProbe;

const SPACE_METRICS: &[&str] = &[DISK_FREE_SPACE_BYTES.name, DISK_TOTAL_SPACE_BYTES.name];

const IO_METRICS: &[&str] = &[
    DISK_TRAFFIC_BYTES.name,
    DISK_TRAFFIC_COUNT.name,
    DISK_TRAFFIC_TIME.name,
    DISK_TRAFFIC_BUSY_TIME.name,
];

/// Free/total space per mounted filesystem.
pub struct DiskSpaceStage {
    probe: Arc<dyn HostProbe>,
}

impl DiskSpaceStage {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl ProbeStage for DiskSpaceStage {
    fn name(&self) -> &'static str {
        "disk_space"
    }

    fn metrics(&self) -> &'static [&'static str] {
        SPACE_METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        for fs in self.probe.filesystems().await? {
            out.instance_for(DISK_FREE_SPACE_BYTES.name)?
                .set_label("device", &fs.device)
                .set_label("name", &fs.mount_point)
                .commit(fs.free)
                .or_skip()?;
            out.instance_for(DISK_TOTAL_SPACE_BYTES.name)?
                .set_label("device", &fs.device)
                .set_label("name", &fs.mount_point)
                .commit(fs.total)
                .or_skip()?;
        }
        Ok(())
    }
}

/// I/O counters of whole physical disks; partitions and virtual block
/// devices are left out.
pub struct DiskIoStage {
    probe: Arc<dyn HostProbe>,
}

impl DiskIoStage {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl ProbeStage for DiskIoStage {
    fn name(&self) -> &'static str {
        "disk_io"
    }

    fn metrics(&self) -> &'static [&'static str] {
        IO_METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let physical = self.probe.physical_disks().await?;
        let counters = self.probe.disk_io().await?;

        for io in counters.iter().filter(|io| physical.contains(&io.name)) {
            let per_direction = [
                (DISK_TRAFFIC_BYTES.name, io.read_bytes, io.write_bytes),
                (DISK_TRAFFIC_COUNT.name, io.read_count, io.write_count),
                (DISK_TRAFFIC_TIME.name, io.read_time_ms, io.write_time_ms),
            ];
            for (metric, read, write) in per_direction {
                let inst = out.instance_for(metric)?;
                inst.set_label("disk", &io.name)
                    .set_label("type", "read")
                    .commit(read)
                    .or_skip()?;
                inst.set_label("disk", &io.name)
                    .set_label("type", "write")
                    .commit(write)
                    .or_skip()?;
            }
            out.instance_for(DISK_TRAFFIC_BUSY_TIME.name)?
                .set_label("disk", &io.name)
                .commit(io.busy_time_ms)
                .or_skip()?;
        }
        Ok(())
    }
}
