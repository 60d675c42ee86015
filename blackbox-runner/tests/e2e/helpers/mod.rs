//! Shared E2E test helpers.
//!
//! Provides mock workers with scripted behavior, canned ffprobe outputs and
//! a builder for test scenarios.

pub mod mock_workers;
pub mod probe;
pub mod scenario;
