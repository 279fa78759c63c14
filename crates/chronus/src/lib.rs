//! Top-level facade crate for chronus.
//!
//! Re-exports the metric model and the exporter library so users can depend on a single crate.

pub mod core {
    pub use chronus_core::*;
}

pub mod exporter {
    pub use chronus_exporter::*;
}
