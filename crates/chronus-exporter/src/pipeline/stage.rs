use async_trait::async_trait;

use chronus_core::error::{ErrorClass, Result};
use chronus_core::MetricRegistry;

/// One category of readings (CPU, memory, disk, ...).
///
/// Stages never read each other's output and must not retry their
/// collaborator; the pipeline owns timeouts.
#[async_trait]
pub trait ProbeStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Metric names this stage may write.
    fn metrics(&self) -> &'static [&'static str];

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()>;
}

/// Gate run before any stage. `Ok(false)` means the target is down.
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    /// Metric names the check may write (liveness indicators).
    fn metrics(&self) -> &'static [&'static str];

    async fn check(&self, out: &mut MetricRegistry) -> Result<bool>;
}

/// Drop a single bad sample instead of failing the whole stage.
pub trait SampleResultExt {
    fn or_skip(self) -> Result<()>;
}

impl<T> SampleResultExt for Result<T> {
    fn or_skip(self) -> Result<()> {
        match self {
            Ok(_) => Ok(()),
            Err(e) if e.class() == ErrorClass::Sample => {
                tracing::warn!(error = %e, "sample dropped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
