//! The probe-vs-deadline race.

use std::time::Duration;

use blackbox_core::aggregate::{Observation, Verdict};
use blackbox_core::error::{BlackboxError, ContextError};
use blackbox_core::Context;

use crate::helpers::mock_workers::{MockFactory, ProberBehavior};
use crate::helpers::probe;
use crate::helpers::scenario::TestScenarioBuilder;

/// A prober that never finishes fails the scenario at its deadline.
#[tokio::test(start_paused = true)]
async fn test_e2e_hanging_prober_expires_deadline() {
    // Given: a prober that never produces a result
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_secs(1))
        .with_prober(ProberBehavior::Hangs);
    let scenario = TestScenarioBuilder::new()
        .timeout(Duration::from_secs(8))
        .build();

    // When
    let report = scenario.run(&factory, &Context::background()).await;

    // Then: the deadline is the reported cause
    assert_eq!(report.observation, Some(Observation::DeadlineExpired));
    assert!(report.elapsed >= Duration::from_secs(8));
    assert!(report.probe.is_none());
    let Verdict::Failed(failure) = &report.verdict else {
        panic!("expected failure, got {:?}", report.verdict);
    };
    assert!(failure.failures.iter().any(|f| matches!(
        f.error,
        BlackboxError::Context(ContextError::DeadlineExceeded)
    )));
    assert!(failure.to_string().contains("deadline exceeded"));
}

/// A probe finishing well before the deadline ends the scenario early.
#[tokio::test(start_paused = true)]
async fn test_e2e_probe_completion_ends_scenario_early() {
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_secs(3));
    let scenario = TestScenarioBuilder::new()
        .timeout(Duration::from_secs(60))
        .build();

    let report = scenario.run(&factory, &Context::background()).await;

    assert_eq!(report.observation, Some(Observation::ProbeCompleted));
    assert!(report.elapsed < Duration::from_secs(60));
}

/// A suite-level cancellation interrupts the scenario; it is not a pass.
#[tokio::test(start_paused = true)]
async fn test_e2e_parent_cancellation_interrupts() {
    // Given: a prober that would take longer than the user waits
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_secs(30));
    let scenario = TestScenarioBuilder::new()
        .timeout(Duration::from_secs(60))
        .build();
    let (root, stop) = Context::with_cancel(&Context::background());

    // When: the run is interrupted after five seconds
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        stop.cancel();
    });
    let report = scenario.run(&factory, &root).await;

    // Then
    assert_eq!(report.observation, Some(Observation::Interrupted));
    let Verdict::Failed(failure) = &report.verdict else {
        panic!("expected failure, got {:?}", report.verdict);
    };
    assert!(failure.to_string().contains("parent scope"), "{failure}");
}
