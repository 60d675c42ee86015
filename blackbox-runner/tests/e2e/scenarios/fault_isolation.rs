//! Worker failures surface in the verdict, attributed to their worker.

use std::time::Duration;

use blackbox_core::aggregate::{Observation, Verdict};
use blackbox_core::error::{BlackboxError, WorkerError};
use blackbox_core::Context;

use crate::helpers::mock_workers::{
    MockFactory, ProberBehavior, PublisherBehavior, ServerBehavior,
};
use crate::helpers::probe;
use crate::helpers::scenario::TestScenarioBuilder;

fn origins(verdict: &Verdict) -> Vec<String> {
    match verdict {
        Verdict::Failed(failure) => failure.failures.iter().map(|f| f.origin.clone()).collect(),
        other => panic!("expected failure, got {other:?}"),
    }
}

/// A publisher failing on its own stops the scenario before the deadline.
#[tokio::test(start_paused = true)]
async fn test_e2e_publisher_failure_interrupts_scenario() {
    // Given: a publisher dying two seconds in, and a slow prober
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_secs(20))
        .with_publisher(PublisherBehavior::FailsAfter(Duration::from_secs(2)));
    let scenario = TestScenarioBuilder::new()
        .timeout(Duration::from_secs(60))
        .build();

    // When
    let report = scenario.run(&factory, &Context::background()).await;

    // Then: interrupted well before the deadline, blamed on the publisher
    assert_eq!(report.observation, Some(Observation::Interrupted));
    assert!(report.elapsed < Duration::from_secs(10));
    let origins = origins(&report.verdict);
    assert!(origins.contains(&"publisher".to_owned()), "{origins:?}");
    assert!(!origins.contains(&"prober".to_owned()), "{origins:?}");

    let Verdict::Failed(failure) = &report.verdict else { unreachable!() };
    assert!(failure.to_string().contains("worker 'publisher'"), "{failure}");
}

/// A crashing server is reported even though the dependents exit cleanly.
#[tokio::test(start_paused = true)]
async fn test_e2e_server_crash_is_reported() {
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_secs(20))
        .with_server(ServerBehavior::CrashesAfter(Duration::from_secs(1)));
    let scenario = TestScenarioBuilder::new().build();

    let report = scenario.run(&factory, &Context::background()).await;

    assert_eq!(report.observation, Some(Observation::Interrupted));
    let Verdict::Failed(failure) = &report.verdict else {
        panic!("expected failure, got {:?}", report.verdict);
    };
    assert!(failure.failures.iter().any(|f| f.origin == "server"
        && matches!(f.error, BlackboxError::Worker(WorkerError::Exited { .. }))));
}

/// A prober failure is attributed to the prober.
#[tokio::test(start_paused = true)]
async fn test_e2e_prober_failure_is_attributed() {
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_secs(1))
        .with_prober(ProberBehavior::FailsAfter(Duration::from_secs(1)));
    let scenario = TestScenarioBuilder::new().build();

    let report = scenario.run(&factory, &Context::background()).await;

    assert!(origins(&report.verdict).contains(&"prober".to_owned()));
    assert!(report.probe.is_none());
}

/// A worker that cannot be built fails the scenario without running anything.
#[tokio::test(start_paused = true)]
async fn test_e2e_build_failure_fails_without_running() {
    // Given: the publisher cannot be constructed
    let factory =
        MockFactory::healthy(probe::hevc("3.0"), Duration::from_secs(1)).failing_build("publisher");
    let scenario = TestScenarioBuilder::new().build();

    // When
    let report = scenario.run(&factory, &Context::background()).await;

    // Then: one failure, nothing started
    assert_eq!(origins(&report.verdict), ["publisher"]);
    assert!(factory.recorder.starts().is_empty());
    assert_eq!(report.slots.len(), 1);
    assert!(report.slots[0].error.as_deref().unwrap().contains("scripted build failure"));
}
