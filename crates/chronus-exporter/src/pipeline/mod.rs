//! Collection pipeline: liveness pre-check, then independent probe stages.
//!
//! Each stage writes into its own staging registry, scoped to the metrics the
//! stage declares. A stage that fails or exceeds its budget loses only its
//! own samples; everything it staged is dropped. Successful staging areas are
//! merged into the pass registry in declared stage order, so the result does
//! not depend on whether stages ran sequentially or concurrently.

pub mod runner;
pub mod stage;

pub use runner::{
    collaborator_budget, CollectionPipeline, PassLimits, PassReport, PipelineState, StageOutcome,
    StageReport,
};
pub use stage::{LivenessCheck, ProbeStage, SampleResultExt};
