use std::sync::Arc;

use async_trait::async_trait;

use chronus_core::error::Result;
use chronus_core::metric::catalog::HARDWARE_CURRENT_TEMPERATURE;
use chronus_core::metric::render::format_value;
use chronus_core::MetricRegistry;

use crate::pipeline::{ProbeStage, SampleResultExt};
use crate::probe::{HostProbe, SensorReading};

const METRICS: &[&str] = &[HARDWARE_CURRENT_TEMPERATURE.name];

/// amdgpu reports its thresholds far above what the card tolerates in practice.
const AMDGPU_HIGH: f64 = 60.0;
const AMDGPU_CRITICAL: f64 = 80.0;

const HDD_HIGH: f64 = 50.0;
const HDD_CRITICAL: f64 = 60.0;

/// `(high, critical)` for a hwmon sensor, clamped to `ceiling`.
///
/// Missing thresholds fall back to the ceiling.
pub fn clamp_thresholds(reading: &SensorReading, ceiling: f64) -> (f64, f64) {
    let (high, critical) = if reading.group == "amdgpu" {
        (Some(AMDGPU_HIGH), Some(AMDGPU_CRITICAL))
    } else {
        (reading.high, reading.critical)
    };
    (
        high.unwrap_or(ceiling).min(ceiling),
        critical.unwrap_or(ceiling).min(ceiling),
    )
}

/// Device label for a hwmon sensor: `<group>_<label>`.
pub fn sensor_device(reading: &SensorReading) -> String {
    format!("{}_{}", reading.group, reading.label)
}

/// hwmon sensors (CPU, GPU, NVMe, ...).
pub struct TemperatureStage {
    probe: Arc<dyn HostProbe>,
    ceiling: f64,
}

impl TemperatureStage {
    pub fn new(probe: Arc<dyn HostProbe>, ceiling: f64) -> Self {
        Self { probe, ceiling }
    }
}

#[async_trait]
impl ProbeStage for TemperatureStage {
    fn name(&self) -> &'static str {
        "temperature"
    }

    fn metrics(&self) -> &'static [&'static str] {
        METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let inst = out.instance_for(HARDWARE_CURRENT_TEMPERATURE.name)?;
        for reading in self.probe.sensors().await? {
            let (high, critical) = clamp_thresholds(&reading, self.ceiling);
            inst.set_label("device", sensor_device(&reading))
                .set_label("high", format_value(high))
                .set_label("critical", format_value(critical))
                .commit(reading.current)
                .or_skip()?;
        }
        Ok(())
    }
}

/// Spinning disks via the hddtemp daemon.
pub struct HddTempStage {
    probe: Arc<dyn HostProbe>,
}

impl HddTempStage {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl ProbeStage for HddTempStage {
    fn name(&self) -> &'static str {
        "hddtemp"
    }

    fn metrics(&self) -> &'static [&'static str] {
        METRICS
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        let inst = out.instance_for(HARDWARE_CURRENT_TEMPERATURE.name)?;
        for reading in self.probe.hdd_temperatures().await? {
            inst.set_label("device", format!("hdd_{}_{}", reading.device, reading.label))
                .set_label("high", format_value(HDD_HIGH))
                .set_label("critical", format_value(HDD_CRITICAL))
                .commit(reading.celsius)
                .or_skip()?;
        }
        Ok(())
    }
}
