#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use chronus_core::error::{ChronusError, Result};
use chronus_core::{MetricDef, MetricRegistry};
use chronus_exporter::pipeline::{
    CollectionPipeline, LivenessCheck, PassLimits, PipelineState, ProbeStage, StageOutcome,
};

const ALIVE: MetricDef = MetricDef::gauge("alive", "target liveness");
const CPU: MetricDef = MetricDef::gauge("cpu", "cpu reading");
const TEMP: MetricDef = MetricDef::gauge("temp", "temperature reading").with_labels(&["device"]);
const SLOW: MetricDef = MetricDef::gauge("slow", "never finishes in time");

const DEFS: &[MetricDef] = &[ALIVE, CPU, TEMP, SLOW];

fn registry() -> MetricRegistry {
    MetricRegistry::new(DEFS, [("host", "h1")]).unwrap()
}

fn limits(stage_ms: u64, deadline_ms: u64, parallel: bool) -> PassLimits {
    PassLimits {
        stage_timeout: Duration::from_millis(stage_ms),
        pass_deadline: Duration::from_millis(deadline_ms),
        parallel,
    }
}

struct Liveness {
    alive: bool,
}

#[async_trait]
impl LivenessCheck for Liveness {
    fn metrics(&self) -> &'static [&'static str] {
        &["alive"]
    }

    async fn check(&self, out: &mut MetricRegistry) -> Result<bool> {
        out.instance_for("alive")?
            .value(if self.alive { 1 } else { 0 })?;
        Ok(self.alive)
    }
}

fn liveness(alive: bool) -> Arc<dyn LivenessCheck> {
    Arc::new(Liveness { alive })
}

/// Writes `value` into `metric` after `delay`, or fails when `fail` is set.
struct FakeStage {
    name: &'static str,
    metrics: &'static [&'static str],
    delay: Duration,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeStage {
    fn new(name: &'static str, metrics: &'static [&'static str]) -> Self {
        Self {
            name,
            metrics,
            delay: Duration::ZERO,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ProbeStage for FakeStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn metrics(&self) -> &'static [&'static str] {
        self.metrics
    }

    async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // partial writes must not survive a failure or a timeout
        for name in self.metrics {
            let inst = out.instance_for(name)?;
            if inst.def().label_count() > 0 {
                inst.set_label("device", "sda").value(40)?;
            } else {
                inst.value(1)?;
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ChronusError::Collaborator(format!("{} broke", self.name)));
        }
        Ok(())
    }
}

#[tokio::test]
async fn full_pass_merges_every_stage() {
    let mut reg = registry();
    let mut pipeline = CollectionPipeline::new(liveness(true), limits(1000, 5000, false))
        .with_stage(Arc::new(FakeStage::new("cpu", &["cpu"])))
        .with_stage(Arc::new(FakeStage::new("temp", &["temp"])));
    pipeline.validate(&reg).unwrap();

    let report = pipeline.run(&mut reg).await;
    assert_eq!(report.state, PipelineState::Done);
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        report.stage("temp").unwrap().outcome,
        StageOutcome::Collected { samples: 1 }
    );

    let text = reg.render().text;
    assert!(text.contains("alive{host=\"h1\"} 1\n"));
    assert!(text.contains("cpu{host=\"h1\"} 1\n"));
    assert!(text.contains("temp{device=\"sda\",host=\"h1\"} 40\n"));
    assert!(!text.contains("# HELP slow"));
}

#[tokio::test]
async fn down_target_aborts_before_any_stage() {
    let stage = FakeStage::new("cpu", &["cpu"]);
    let calls = Arc::clone(&stage.calls);

    let mut reg = registry();
    let mut pipeline =
        CollectionPipeline::new(liveness(false), limits(1000, 5000, false)).with_stage(Arc::new(stage));
    let report = pipeline.run(&mut reg).await;

    assert_eq!(report.state, PipelineState::Aborted);
    assert!(report.stages.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // the liveness indicator is still reported
    let text = reg.render().text;
    assert!(text.contains("alive{host=\"h1\"} 0\n"));
    assert!(!text.contains("cpu{"));
}

#[tokio::test]
async fn timed_out_stage_loses_only_its_samples() {
    let mut reg = registry();
    let mut pipeline = CollectionPipeline::new(liveness(true), limits(100, 5000, false))
        .with_stage(Arc::new(FakeStage::new("cpu", &["cpu"])))
        .with_stage(Arc::new(
            FakeStage::new("slow", &["slow"]).delayed(Duration::from_secs(10)),
        ))
        .with_stage(Arc::new(FakeStage::new("temp", &["temp"])));

    let report = pipeline.run(&mut reg).await;
    assert_eq!(report.state, PipelineState::Done);
    assert_eq!(report.stage("slow").unwrap().outcome, StageOutcome::TimedOut);
    assert_eq!(report.failed(), 1);

    let text = reg.render().text;
    assert!(text.contains("cpu{host=\"h1\"} 1\n"));
    assert!(text.contains("temp{device=\"sda\",host=\"h1\"} 40\n"));
    assert!(!text.contains("slow"));
}

#[tokio::test]
async fn failed_stage_drops_partial_writes() {
    let mut reg = registry();
    let mut pipeline = CollectionPipeline::new(liveness(true), limits(1000, 5000, false))
        .with_stage(Arc::new(FakeStage::new("temp", &["temp"]).failing()))
        .with_stage(Arc::new(FakeStage::new("cpu", &["cpu"])));

    let report = pipeline.run(&mut reg).await;
    assert!(matches!(
        report.stage("temp").unwrap().outcome,
        StageOutcome::Failed(_)
    ));
    assert!(reg.get("temp").unwrap().is_empty());
    assert_eq!(reg.get("cpu").unwrap().len(), 1);
}

#[tokio::test]
async fn stage_writing_undeclared_metric_fails_alone() {
    // declares "cpu" but also tries to write "temp" via its metric list
    struct Sneaky;

    #[async_trait]
    impl ProbeStage for Sneaky {
        fn name(&self) -> &'static str {
            "sneaky"
        }
        fn metrics(&self) -> &'static [&'static str] {
            &["cpu"]
        }
        async fn collect(&self, out: &mut MetricRegistry) -> Result<()> {
            out.instance_for("cpu")?.value(3)?;
            out.instance_for("temp")?.set_label("device", "x").value(1)?;
            Ok(())
        }
    }

    let mut reg = registry();
    let mut pipeline =
        CollectionPipeline::new(liveness(true), limits(1000, 5000, false)).with_stage(Arc::new(Sneaky));
    let report = pipeline.run(&mut reg).await;

    assert!(matches!(
        report.stage("sneaky").unwrap().outcome,
        StageOutcome::Failed(_)
    ));
    assert!(reg.get("cpu").unwrap().is_empty());
    assert!(reg.get("temp").unwrap().is_empty());
}

#[tokio::test]
async fn parallel_mode_keeps_declared_merge_order() {
    let mut reg = registry();
    let mut pipeline = CollectionPipeline::new(liveness(true), limits(1000, 5000, true))
        .with_stage(Arc::new(
            FakeStage::new("temp", &["temp"]).delayed(Duration::from_millis(50)),
        ))
        .with_stage(Arc::new(FakeStage::new("cpu", &["cpu"])));

    let report = pipeline.run(&mut reg).await;
    let order: Vec<_> = report.stages.iter().map(|s| s.stage).collect();
    assert_eq!(order, vec!["temp", "cpu"]);
    assert_eq!(report.failed(), 0);

    let text = reg.render().text;
    let temp_at = text.find("# HELP temp").unwrap();
    let cpu_at = text.find("# HELP cpu").unwrap();
    assert!(cpu_at < temp_at, "render follows registry declaration order");
}

#[tokio::test]
async fn stages_past_the_pass_deadline_are_skipped() {
    let late = FakeStage::new("cpu", &["cpu"]);
    let calls = Arc::clone(&late.calls);

    let mut reg = registry();
    let mut pipeline = CollectionPipeline::new(liveness(true), limits(100, 100, false))
        .with_stage(Arc::new(
            FakeStage::new("slow", &["slow"]).delayed(Duration::from_secs(10)),
        ))
        .with_stage(Arc::new(late));

    let report = pipeline.run(&mut reg).await;
    assert_eq!(report.stage("slow").unwrap().outcome, StageOutcome::TimedOut);
    assert_eq!(report.stage("cpu").unwrap().outcome, StageOutcome::Skipped);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pipeline_runs_once() {
    let stage = FakeStage::new("cpu", &["cpu"]);
    let calls = Arc::clone(&stage.calls);

    let mut reg = registry();
    let mut pipeline =
        CollectionPipeline::new(liveness(true), limits(1000, 5000, false)).with_stage(Arc::new(stage));
    pipeline.run(&mut reg).await;
    let second = pipeline.run(&mut reg).await;

    assert!(second.stages.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn validate_rejects_undeclared_metric_names() {
    let reg = registry();
    let pipeline = CollectionPipeline::new(liveness(true), limits(1000, 5000, false))
        .with_stage(Arc::new(FakeStage::new("disk", &["disk_bytes"])));

    let err = pipeline.validate(&reg).unwrap_err();
    assert!(matches!(err, ChronusError::UnknownMetric(ref n) if n == "disk_bytes"));
    assert_eq!(pipeline.stage_names(), vec!["disk"]);
}
