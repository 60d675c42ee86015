//! Readiness gating: dependents start only after the server is ready.

use std::time::Duration;

use blackbox_core::Context;
use blackbox_core::aggregate::Observation;
use blackbox_runner::scenario::ScenarioReport;

use crate::helpers::mock_workers::{MockFactory, ServerBehavior};
use crate::helpers::probe;
use crate::helpers::scenario::TestScenarioBuilder;

fn worker_error<'a>(report: &'a ScenarioReport, worker: &str) -> Option<&'a str> {
    report
        .slots
        .iter()
        .find(|s| s.name == worker)
        .and_then(|s| s.error.as_deref())
}

/// Publisher and prober enter `run` no earlier than the server's ready gate fired.
#[tokio::test(start_paused = true)]
async fn test_e2e_dependents_start_after_server_ready() {
    // Given: a server that needs two seconds to accept connections
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_millis(500))
        .with_server(ServerBehavior::Healthy {
            ready_after: Duration::from_secs(2),
        });
    let scenario = TestScenarioBuilder::new().build();

    // When: the scenario runs
    let report = scenario.run(&factory, &Context::background()).await;

    // Then: both dependents started at or after the gate fired
    assert!(report.verdict.is_passed(), "verdict: {:?}", report.verdict);
    let gates = factory.recorder.server_gates();
    let fired_at = gates[0].fired_at().expect("server became ready");
    for worker in ["publisher", "prober"] {
        let started = factory
            .recorder
            .started_at(worker)
            .unwrap_or_else(|| panic!("{worker} never started"));
        assert!(started >= fired_at, "{worker} started before the server was ready");
    }
}

/// Ordering holds across thread interleavings and timings: many scenarios
/// run at once on a multi-threaded runtime with varied ready and probe delays.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_e2e_dependents_never_start_before_ready_under_contention() {
    // Given: every combination of server and prober delay, run concurrently
    let ready_delays = [0, 1, 5, 20];
    let probe_delays = [0, 1, 10];
    let mut tasks = tokio::task::JoinSet::new();
    for ready_ms in ready_delays {
        for probe_ms in probe_delays {
            tasks.spawn(async move {
                let factory =
                    MockFactory::healthy(probe::hevc("3.0"), Duration::from_millis(probe_ms))
                        .with_server(ServerBehavior::Healthy {
                            ready_after: Duration::from_millis(ready_ms),
                        });
                let scenario = TestScenarioBuilder::new().build();

                // When
                let report = scenario.run(&factory, &Context::background()).await;
                (ready_ms, probe_ms, factory, report)
            });
        }
    }

    // Then: each run passed and no dependent started before its gate fired
    let mut runs = 0;
    while let Some(joined) = tasks.join_next().await {
        let (ready_ms, probe_ms, factory, report) = joined.unwrap();
        let case = format!("ready={ready_ms}ms probe={probe_ms}ms");
        assert!(report.verdict.is_passed(), "{case}: {:?}", report.verdict);

        let fired_at = factory.recorder.server_gates()[0]
            .fired_at()
            .unwrap_or_else(|| panic!("{case}: server never ready"));
        let prober = factory
            .recorder
            .started_at("prober")
            .unwrap_or_else(|| panic!("{case}: prober never started"));
        assert!(prober >= fired_at, "{case}: prober started early");
        // an instant probe may finish the scenario before the publisher is
        // scheduled; if it ran at all, it ran after the gate
        if let Some(publisher) = factory.recorder.started_at("publisher") {
            assert!(publisher >= fired_at, "{case}: publisher started early");
        }
        runs += 1;
    }
    assert_eq!(runs, ready_delays.len() * probe_delays.len());
}

/// The server is started even though nobody waits on it.
#[tokio::test(start_paused = true)]
async fn test_e2e_server_starts_ungated() {
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_millis(500));
    let scenario = TestScenarioBuilder::new().build();

    let _ = scenario.run(&factory, &Context::background()).await;

    let starts = factory.recorder.starts();
    assert_eq!(starts[0].0, "server");
    assert_eq!(starts.len(), 3);
}

/// A server that never becomes ready fails the scenario at its deadline
/// without ever starting the dependents.
#[tokio::test(start_paused = true)]
async fn test_e2e_never_ready_server_hits_deadline() {
    // Given: a server that never accepts connections
    let factory = MockFactory::healthy(probe::hevc("3.0"), Duration::from_millis(500))
        .with_server(ServerBehavior::NeverReady);
    let scenario = TestScenarioBuilder::new()
        .timeout(Duration::from_secs(5))
        .build();

    // When: the scenario runs
    let report = scenario.run(&factory, &Context::background()).await;

    // Then: the deadline decided the outcome
    assert_eq!(report.observation, Some(Observation::DeadlineExpired));
    assert!(report.verdict.is_failed());
    assert!(report.elapsed >= Duration::from_secs(5));

    // Then: only the server ever ran
    assert_eq!(factory.recorder.started_at("publisher"), None);
    assert_eq!(factory.recorder.started_at("prober"), None);

    // Then: the gated workers record the interruption in their slots
    for worker in ["publisher", "prober"] {
        let err = worker_error(&report, worker).expect("gated worker has an error");
        assert!(err.contains("deadline exceeded"), "{worker}: {err}");
    }
    assert_eq!(worker_error(&report, "server"), None);
}
