//! Blackbox runner library.
//!
//! Exposes the scenario orchestrator and catalog for integration testing.
//! In production, `blackbox-runner` is used as a binary (main.rs).

pub mod catalog;
pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod report;
pub mod scenario;
pub mod suite;
