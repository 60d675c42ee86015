//! E2E test scenarios organized by orchestration concern.

mod deadline;
mod fault_isolation;
mod readiness;
