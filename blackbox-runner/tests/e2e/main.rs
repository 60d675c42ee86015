//! E2E integration tests for blackbox-runner.
//!
//! These tests drive the scenario orchestrator against mock workers to
//! validate readiness gating, the probe-vs-deadline race, error
//! aggregation and suite reporting without any external process.
//!
//! # Test Structure
//!
//! - `helpers/` -- mock workers and factory, probe fixtures, scenario builder
//! - `scenarios/` -- test files organized by orchestration concern
//!
//! # Running
//!
//! ```bash
//! cargo test -p blackbox-runner --test e2e
//! ```

mod helpers;
mod scenarios;
