use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::time::{timeout, Duration, Instant};

use chronus_core::error::Result;
use chronus_core::{ChronusError, MetricRegistry};

use super::stage::{LivenessCheck, ProbeStage};
use crate::config::CollectSection;

/// Pass lifecycle: `NotStarted -> Running -> Done | Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy)]
pub struct PassLimits {
    /// Budget of a single stage (and of the pre-check).
    pub stage_timeout: Duration,
    /// Budget of the whole pass; stages that cannot start before it are skipped.
    pub pass_deadline: Duration,
    /// Run stages concurrently instead of in declared order.
    pub parallel: bool,
}

impl Default for PassLimits {
    fn default() -> Self {
        (&CollectSection::default()).into()
    }
}

impl PassLimits {
    /// Budget of the liveness pre-check.
    pub fn check_budget(&self) -> Duration {
        self.stage_timeout.min(self.pass_deadline)
    }
}

/// Budget of a single collaborator call made inside a stage or pre-check.
///
/// Half the enclosing budget, so the call's own timeout always fires first
/// and only that call's samples are lost.
pub fn collaborator_budget(enclosing: Duration) -> Duration {
    enclosing / 2
}

impl From<&CollectSection> for PassLimits {
    fn from(c: &CollectSection) -> Self {
        Self {
            stage_timeout: c.stage_timeout(),
            pass_deadline: c.pass_deadline(),
            parallel: c.parallel,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Collected { samples: usize },
    Failed(String),
    TimedOut,
    /// Not started because the pass deadline had passed.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: &'static str,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub state: PipelineState,
    pub stages: Vec<StageReport>,
}

impl PassReport {
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub fn failed(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| !matches!(s.outcome, StageOutcome::Collected { .. }))
            .count()
    }
}

struct Finished {
    outcome: StageOutcome,
    staged: Option<MetricRegistry>,
    elapsed: Duration,
}

impl Finished {
    fn without_run(outcome: StageOutcome) -> Self {
        Self {
            outcome,
            staged: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// One collection pass over a registry.
pub struct CollectionPipeline {
    liveness: Arc<dyn LivenessCheck>,
    stages: Vec<Arc<dyn ProbeStage>>,
    limits: PassLimits,
    state: PipelineState,
}

impl CollectionPipeline {
    pub fn new(liveness: Arc<dyn LivenessCheck>, limits: PassLimits) -> Self {
        Self {
            liveness,
            stages: Vec::new(),
            limits,
            state: PipelineState::NotStarted,
        }
    }

    pub fn with_stage(mut self, stage: Arc<dyn ProbeStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Arc<dyn ProbeStage>>) -> Self {
        self.stages.extend(stages);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Check every declared metric name against `registry`.
    ///
    /// Run once at startup; an unknown name is a wiring bug.
    pub fn validate(&self, registry: &MetricRegistry) -> Result<()> {
        let declared = self
            .stages
            .iter()
            .flat_map(|s| s.metrics().iter())
            .chain(self.liveness.metrics().iter());
        for name in declared {
            if !registry.contains(name) {
                return Err(ChronusError::UnknownMetric((*name).to_string()));
            }
        }
        Ok(())
    }

    /// Full pass: pre-check, then every stage exactly once.
    pub async fn run(&mut self, registry: &mut MetricRegistry) -> PassReport {
        if self.state != PipelineState::NotStarted {
            tracing::warn!(state = ?self.state, "pipeline already ran, ignoring");
            return PassReport {
                state: self.state,
                stages: Vec::new(),
            };
        }

        let deadline = Instant::now() + self.limits.pass_deadline;
        if !self.pre_check(registry).await {
            tracing::info!("target is down, pass aborted");
            return PassReport {
                state: PipelineState::Aborted,
                stages: Vec::new(),
            };
        }

        let stages = self.run_stages(registry, deadline).await;
        self.state = PipelineState::Done;
        PassReport {
            state: self.state,
            stages,
        }
    }

    /// Liveness gate. Liveness records are kept even when the target is down.
    pub async fn pre_check(&mut self, registry: &mut MetricRegistry) -> bool {
        self.state = PipelineState::Running;

        let alive = match registry.scoped(self.liveness.metrics()) {
            Err(e) => {
                tracing::warn!(error = %e, "pre-check wiring error");
                false
            }
            Ok(mut staging) => {
                let budget = self.limits.check_budget();
                match timeout(budget, self.liveness.check(&mut staging)).await {
                    Ok(Ok(alive)) => match registry.merge(staging) {
                        Ok(()) => alive,
                        Err(e) => {
                            tracing::warn!(error = %e, "pre-check merge failed");
                            false
                        }
                    },
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "pre-check failed");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(
                            timeout_ms = budget.as_millis() as u64,
                            "pre-check timed out"
                        );
                        false
                    }
                }
            }
        };

        if !alive {
            self.state = PipelineState::Aborted;
        }
        alive
    }

    /// Run every stage once and merge successful staging areas in declared
    /// order.
    pub async fn run_stages(
        &mut self,
        registry: &mut MetricRegistry,
        deadline: Instant,
    ) -> Vec<StageReport> {
        let n = self.stages.len();
        let mut slots: Vec<Option<Finished>> = (0..n).map(|_| None).collect();

        if self.limits.parallel {
            let mut pending = FuturesUnordered::new();
            for (i, stage) in self.stages.iter().enumerate() {
                match self.prepare(stage.as_ref(), registry, deadline) {
                    Ok((staging, budget)) => {
                        pending.push(run_one(i, Arc::clone(stage), staging, budget))
                    }
                    Err(done) => slots[i] = Some(done),
                }
            }
            while let Some((i, done)) = pending.next().await {
                slots[i] = Some(done);
            }
        } else {
            for (i, stage) in self.stages.iter().enumerate() {
                let done = match self.prepare(stage.as_ref(), registry, deadline) {
                    Ok((staging, budget)) => run_one(i, Arc::clone(stage), staging, budget).await.1,
                    Err(done) => done,
                };
                slots[i] = Some(done);
            }
        }

        let mut reports = Vec::with_capacity(n);
        for (stage, slot) in self.stages.iter().zip(slots) {
            let Some(mut done) = slot else { continue };
            if let Some(staged) = done.staged.take() {
                if let Err(e) = registry.merge(staged) {
                    tracing::warn!(stage = %stage.name(), error = %e, "stage merge failed");
                    done.outcome = StageOutcome::Failed(e.to_string());
                }
            }
            reports.push(StageReport {
                stage: stage.name(),
                outcome: done.outcome,
                elapsed: done.elapsed,
            });
        }
        reports
    }

    fn prepare(
        &self,
        stage: &dyn ProbeStage,
        registry: &MetricRegistry,
        deadline: Instant,
    ) -> std::result::Result<(MetricRegistry, Duration), Finished> {
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(stage = %stage.name(), "pass deadline reached, stage skipped");
            return Err(Finished::without_run(StageOutcome::Skipped));
        }
        let budget = self.limits.stage_timeout.min(deadline - now);
        match registry.scoped(stage.metrics()) {
            Ok(staging) => Ok((staging, budget)),
            Err(e) => {
                tracing::warn!(stage = %stage.name(), error = %e, "stage wiring error");
                Err(Finished::without_run(StageOutcome::Failed(e.to_string())))
            }
        }
    }
}

async fn run_one(
    i: usize,
    stage: Arc<dyn ProbeStage>,
    mut staging: MetricRegistry,
    budget: Duration,
) -> (usize, Finished) {
    let started = Instant::now();
    let res = timeout(budget, stage.collect(&mut staging)).await;
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;

    let done = match res {
        Ok(Ok(())) => {
            let samples = staging.record_count();
            tracing::debug!(stage = %stage.name(), samples, elapsed_ms, "stage collected");
            Finished {
                outcome: StageOutcome::Collected { samples },
                staged: Some(staging),
                elapsed,
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(
                stage = %stage.name(),
                class = e.class().as_str(),
                error = %e,
                elapsed_ms,
                "stage failed, samples dropped"
            );
            Finished {
                outcome: StageOutcome::Failed(e.to_string()),
                staged: None,
                elapsed,
            }
        }
        Err(_) => {
            tracing::warn!(
                stage = %stage.name(),
                budget_ms = budget.as_millis() as u64,
                "stage timed out, samples dropped"
            );
            Finished {
                outcome: StageOutcome::TimedOut,
                staged: None,
                elapsed,
            }
        }
    };
    (i, done)
}
