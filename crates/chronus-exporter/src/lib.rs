//! chronus exporter library entry.
//!
//! Wires configuration, probe collaborators, the collection pipeline, and the
//! HTTP ops endpoints into an exporter. Consumed by the binary (`main.rs`) and
//! by integration tests.

pub mod app_state;
pub mod cli;
pub mod collector;
pub mod config;
pub mod ops;
pub mod pipeline;
pub mod probe;
pub mod router;
pub mod stages;
