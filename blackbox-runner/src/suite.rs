//! Suite execution -- preflight, then every selected scenario in parallel.
//!
//! Scenarios are independent: each gets its own stream id, server ports and
//! scope derived from the suite context, so they run concurrently the way
//! parallel tests would.

use std::sync::Arc;

use blackbox_core::worker::WorkerFactory;
use blackbox_core::{BlackboxConfig, Context};
use blackbox_workers::{ProcessWorkerFactory, preflight};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::catalog;
use crate::report::SuiteReport;
use crate::scenario::{Scenario, ScenarioReport};

/// The configured run: which scenarios, under which configuration.
#[derive(Debug, Clone)]
pub struct Suite {
    config: Arc<BlackboxConfig>,
    scenarios: Vec<Scenario>,
}

impl Suite {
    /// Select the built-in scenarios matching `filters` (all when empty).
    pub fn new(config: BlackboxConfig, filters: &[String]) -> Self {
        let scenarios = catalog::select(catalog::hevc_scenarios(&config), filters);
        Self {
            config: Arc::new(config),
            scenarios,
        }
    }

    /// Run an explicit scenario list.
    pub fn with_scenarios(config: BlackboxConfig, scenarios: Vec<Scenario>) -> Self {
        Self {
            config: Arc::new(config),
            scenarios,
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn config(&self) -> &BlackboxConfig {
        &self.config
    }

    /// Check the host, then run every scenario against real processes.
    /// A failed preflight skips every scenario.
    pub async fn run_processes(&self, ctx: &Context) -> SuiteReport {
        if let Err(reason) = preflight(&self.config).await {
            warn!(%reason, "preflight failed, skipping all scenarios");
            let reason = reason.to_string();
            return SuiteReport::new(
                self.scenarios
                    .iter()
                    .map(|s| ScenarioReport::skipped(s, reason.clone()))
                    .collect(),
            );
        }

        let factory = Arc::new(ProcessWorkerFactory::new(self.config.clone()));
        self.run(factory, ctx).await
    }

    /// Run every scenario concurrently with workers from `factory`.
    /// Reports keep the suite's scenario order.
    pub async fn run<F>(&self, factory: Arc<F>, ctx: &Context) -> SuiteReport
    where
        F: WorkerFactory + 'static,
    {
        info!(scenarios = self.scenarios.len(), "suite starting");

        let mut tasks = JoinSet::new();
        for (index, scenario) in self.scenarios.iter().cloned().enumerate() {
            let factory = factory.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move { (index, scenario.run(factory.as_ref(), &ctx).await) });
        }

        let mut slots: Vec<Option<ScenarioReport>> = Vec::new();
        slots.resize_with(self.scenarios.len(), || None);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(e) => error!(error = %e, "scenario task aborted"),
            }
        }

        let reports = slots
            .into_iter()
            .zip(&self.scenarios)
            .map(|(report, scenario)| {
                report.unwrap_or_else(|| {
                    ScenarioReport::aborted(scenario, "scenario task panicked")
                })
            })
            .collect();

        let report = SuiteReport::new(reports);
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "suite finished"
        );
        report
    }
}
