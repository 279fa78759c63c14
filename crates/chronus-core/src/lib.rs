//! chronus core: the metric model shared by every collector.
//!
//! A closed set of [`MetricDef`] schemas is turned into a [`MetricRegistry`]
//! holding one [`MetricInstance`] per definition. Collectors commit fully
//! labeled samples through each instance's [`LabelBinding`] and the registry
//! renders the result in Prometheus text exposition format.
//!
//! This crate carries no runtime or transport dependencies.
//!
//! # Panics
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `ChronusError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;

/// Shared result type.
pub use error::{ChronusError, ErrorClass, Result};
pub use metric::{
    Exposition, LabelBinding, MetricDef, MetricInstance, MetricKind, MetricRegistry, SampleValue,
    ValueRecord,
};
