//! Suite results: text and JSON rendering of scenario reports.

use std::fmt;

use blackbox_core::aggregate::Verdict;
use blackbox_core::protocol::DeliveryProtocol;
use serde::Serialize;

use crate::scenario::{ScenarioReport, SlotSummary};

/// All scenario reports of one run, in catalog order.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub reports: Vec<ScenarioReport>,
}

/// Serializable view of one [`ScenarioReport`].
#[derive(Debug, Serialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub protocol: DeliveryProtocol,
    pub stream_id: String,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<&'static str>,
    pub elapsed_ms: u64,
    /// Failure or skip reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<String>,
    pub workers: Vec<SlotSummary>,
}

#[derive(Debug, Serialize)]
pub struct SuiteSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub scenarios: Vec<ScenarioSummary>,
}

impl SuiteReport {
    pub fn new(reports: Vec<ScenarioReport>) -> Self {
        Self { reports }
    }

    pub fn passed(&self) -> usize {
        self.count(Verdict::is_passed)
    }

    pub fn failed(&self) -> usize {
        self.count(Verdict::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(Verdict::is_skipped)
    }

    /// No scenario failed. Skipped scenarios do not count against the run.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            passed: self.passed(),
            failed: self.failed(),
            skipped: self.skipped(),
            scenarios: self.reports.iter().map(summarize).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }

    fn count(&self, pred: fn(&Verdict) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.verdict)).count()
    }
}

fn summarize(report: &ScenarioReport) -> ScenarioSummary {
    let reason = match &report.verdict {
        Verdict::Passed => None,
        Verdict::Failed(failure) => Some(failure.to_string()),
        Verdict::Skipped(reason) => Some(reason.clone()),
    };
    ScenarioSummary {
        name: report.name.clone(),
        protocol: report.protocol,
        stream_id: report.stream_id.clone(),
        verdict: report.verdict.label(),
        observation: report.observation.map(|o| o.as_str()),
        elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        reason,
        probe: report.probe.as_ref().map(|p| p.result.to_string()),
        workers: report.slots.clone(),
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            write!(
                f,
                "{:<8} {:<16} {:>8.1}s",
                report.verdict.label(),
                report.name,
                report.elapsed.as_secs_f64()
            )?;
            match &report.verdict {
                Verdict::Passed => {
                    if let Some(probe) = &report.probe {
                        write!(f, "  {}", probe.result)?;
                    }
                }
                Verdict::Failed(failure) => write!(f, "  {failure}")?,
                Verdict::Skipped(reason) => write!(f, "  {reason}")?,
            }
            writeln!(f)?;
        }
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}
