//! Static metric schemas.
//!
//! Definitions are plain `const` values so the full set known to a collector
//! is a compile-time list (see [`super::catalog`]).

use crate::error::{ChronusError, Result};

/// Label names bound on every metric unless a definition overrides them.
pub const DEFAULT_COMMON_LABELS: &[&str] = &["host"];

/// Series kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Instantaneous reading; the latest commit per label set wins.
    Gauge,
    /// Amount reported this pass; commits per label set are summed.
    Counter,
    /// Key/value payload exposed with a constant value of 1.
    Info,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Info => "info",
        }
    }

    /// Type written to the `# TYPE` preamble (text format 0.0.4 has no info type).
    pub fn exposition_type(self) -> &'static str {
        match self {
            MetricKind::Gauge | MetricKind::Info => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// Immutable schema of one named series family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDef {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    /// Labels specific to this metric, in exposition order.
    pub labels: &'static [&'static str],
    /// Labels required on every metric, emitted after `labels`.
    pub common_labels: &'static [&'static str],
}

impl MetricDef {
    pub const fn new(name: &'static str, help: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            help,
            kind,
            labels: &[],
            common_labels: DEFAULT_COMMON_LABELS,
        }
    }

    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self::new(name, help, MetricKind::Gauge)
    }

    pub const fn counter(name: &'static str, help: &'static str) -> Self {
        Self::new(name, help, MetricKind::Counter)
    }

    pub const fn info(name: &'static str, help: &'static str) -> Self {
        Self::new(name, help, MetricKind::Info)
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    pub const fn with_common_labels(mut self, common_labels: &'static [&'static str]) -> Self {
        self.common_labels = common_labels;
        self
    }

    /// All label names in exposition order: own labels, then common labels.
    pub fn label_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.labels.iter().chain(self.common_labels.iter()).copied()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len() + self.common_labels.len()
    }

    /// Check name syntax and that no label name appears twice.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(self.name) {
            return Err(ChronusError::InvalidName(self.name.to_string()));
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.label_count());
        for label in self.label_names() {
            if !is_valid_name(label) || label.starts_with("__") || seen.contains(&label) {
                return Err(ChronusError::InvalidName(format!("{}.{}", self.name, label)));
            }
            seen.push(label);
        }
        Ok(())
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub(crate) fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
