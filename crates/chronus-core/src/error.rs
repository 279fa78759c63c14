//! Shared error type across chronus crates.

use thiserror::Error;

/// Coarse error classes (stable API).
///
/// The class decides how far an error propagates: `Definition` and `Startup`
/// abort the process, everything else is recovered inside a collection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Broken metric schema or registry wiring.
    Definition,
    /// A single sample could not be committed.
    Sample,
    /// A probe, subprocess or hypervisor call failed or timed out.
    Collaborator,
    /// The collection target is down.
    Liveness,
    /// Bad configuration or missing privilege.
    Startup,
    /// Internal invariant violation.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Definition => "DEFINITION",
            ErrorClass::Sample => "SAMPLE",
            ErrorClass::Collaborator => "COLLABORATOR",
            ErrorClass::Liveness => "LIVENESS",
            ErrorClass::Startup => "STARTUP",
            ErrorClass::Internal => "INTERNAL",
        }
    }

    /// Whether an error of this class must abort startup.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorClass::Definition | ErrorClass::Startup)
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ChronusError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum ChronusError {
    #[error("duplicate metric definition: {0}")]
    DuplicateDefinition(String),
    #[error("metric {metric} has unset labels: {}", missing.join(","))]
    IncompleteLabels { metric: String, missing: Vec<String> },
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("metric {metric} has no label named {label}")]
    UnknownLabel { metric: String, label: String },
    #[error("metric {metric} of kind {kind} cannot take this value")]
    KindMismatch { metric: String, kind: &'static str },
    #[error("invalid metric or label name: {0:?}")]
    InvalidName(String),
    #[error("common label <{label}> for metric <{metric}> missed")]
    MissingCommonLabel { metric: String, label: String },
    #[error("collaborator failure: {0}")]
    Collaborator(String),
    #[error("{what} timed out after {after_ms}ms")]
    Timeout { what: String, after_ms: u64 },
    #[error("target is down: {0}")]
    Liveness(String),
    #[error("config: {0}")]
    Config(String),
    #[error("insufficient privilege: {0}")]
    Privilege(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ChronusError {
    /// Map the error to its propagation class.
    pub fn class(&self) -> ErrorClass {
        match self {
            ChronusError::DuplicateDefinition(_)
            | ChronusError::UnknownMetric(_)
            | ChronusError::InvalidName(_)
            | ChronusError::MissingCommonLabel { .. } => ErrorClass::Definition,
            ChronusError::IncompleteLabels { .. }
            | ChronusError::UnknownLabel { .. }
            | ChronusError::KindMismatch { .. } => ErrorClass::Sample,
            ChronusError::Collaborator(_) | ChronusError::Timeout { .. } => {
                ErrorClass::Collaborator
            }
            ChronusError::Liveness(_) => ErrorClass::Liveness,
            ChronusError::Config(_) | ChronusError::Privilege(_) => ErrorClass::Startup,
            ChronusError::Internal(_) => ErrorClass::Internal,
        }
    }
}

impl From<std::io::Error> for ChronusError {
    fn from(e: std::io::Error) -> Self {
        ChronusError::Collaborator(e.to_string())
    }
}
