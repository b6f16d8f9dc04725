//! Soctide daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `soctide-daemon` is used as a binary (main.rs).

pub mod bridge;
pub mod cli;
pub mod logging;
pub mod orchestrator;
pub mod scorers;
