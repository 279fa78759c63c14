//! Metric model: schemas, label cursors, record sets, and the registry.

pub mod binding;
pub mod catalog;
pub mod definition;
pub mod instance;
pub mod registry;
pub mod render;

pub use binding::LabelBinding;
pub use definition::{MetricDef, MetricKind, DEFAULT_COMMON_LABELS};
pub use instance::{MetricInstance, SampleValue, ValueRecord};
pub use registry::MetricRegistry;
pub use render::Exposition;
