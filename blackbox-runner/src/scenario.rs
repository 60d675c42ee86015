//! Scenario orchestration -- one publish, deliver and verify round trip.
//!
//! A [`Scenario`] drives three workers built by a [`WorkerFactory`] inside a
//! single bounded [`Context`]:
//!
//! ```text
//!            ┌──────────── scenario ctx (timeout) ────────────┐
//!  server ───┤ run ──────────────────────────────────────────▶│
//!            │   └─ ready ─┬─▶ publisher run ────────────────▶│
//!            │             └─▶ prober run ── probe_done ──┐   │
//!            │                                            ▼   │
//!  orchestrator: race(ctx done, probe_done) ─▶ cancel ─▶ join all
//!            └─▶ verify (probe completed only) ─▶ aggregate ─▶ verdict
//! ```
//!
//! Every task is joined before the verdict is computed, so each worker's
//! slot is written exactly once and the probe result is never read while
//! a writer is still running.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use blackbox_core::aggregate::{
    self, Evidence, Failure, Observation, ScenarioFailure, Verdict, WorkerSlot,
};
use blackbox_core::error::{ProbeError, WorkerError};
use blackbox_core::metrics as m;
use blackbox_core::probe::ProbeOutput;
use blackbox_core::protocol::{self, DeliveryProtocol};
use blackbox_core::verify::{self, DurationRatio, Expectation};
use blackbox_core::worker::{
    DynWorker, MediaServer, ProberSettings, PublisherSettings, ServerSettings, StreamProber,
    WorkerFactory,
};
use blackbox_core::{CancelHandle, Context, ReadyGate};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::catalog;

/// Plain configuration of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub protocol: DeliveryProtocol,
    /// Host used in publish and play URLs
    pub host: String,
    /// Publish input, relative to the server work dir
    pub publish_input: PathBuf,
    /// Hard ceiling for the whole scenario
    pub timeout: Duration,
    /// Nominal capture duration, before the protocol multiplier
    pub capture: Duration,
    /// Nominal capture timeout, before the protocol multiplier
    pub capture_timeout: Duration,
    /// Share of the capture the probed duration must reach
    pub min_duration_ratio: DurationRatio,
    pub video_codec: String,
}

/// One worker's slot as kept in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSummary {
    pub name: String,
    pub error: Option<String>,
}

/// Everything observed while running a [`Scenario`].
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub protocol: DeliveryProtocol,
    pub stream_id: String,
    /// How the observation phase ended; `None` when the scenario never ran
    pub observation: Option<Observation>,
    pub verdict: Verdict,
    pub slots: Vec<SlotSummary>,
    pub probe: Option<ProbeOutput>,
    pub elapsed: Duration,
}

impl ScenarioReport {
    /// A report for a scenario that never started.
    pub fn skipped(scenario: &Scenario, reason: impl Into<String>) -> Self {
        Self {
            name: scenario.name.clone(),
            protocol: scenario.protocol,
            stream_id: String::new(),
            observation: None,
            verdict: Verdict::Skipped(reason.into()),
            slots: Vec::new(),
            probe: None,
            elapsed: Duration::ZERO,
        }
    }

    /// A failed report for a scenario whose task died before reporting.
    pub fn aborted(scenario: &Scenario, reason: impl Into<String>) -> Self {
        let error = WorkerError::Aborted {
            worker: "orchestrator".to_owned(),
            reason: reason.into(),
        };
        Self {
            verdict: Verdict::Failed(ScenarioFailure {
                failures: vec![Failure {
                    origin: scenario.name.clone(),
                    error: error.into(),
                }],
            }),
            ..Self::skipped(scenario, String::new())
        }
    }
}

/// The three workers of a running scenario.
struct Crew<F: WorkerFactory> {
    server: Arc<F::Server>,
    publisher: Arc<F::Publisher>,
    prober: Arc<F::Prober>,
}

impl Scenario {
    /// Capture duration handed to the prober.
    pub fn probe_duration(&self) -> Duration {
        self.capture * self.protocol.capture_multiplier()
    }

    /// Capture timeout handed to the prober.
    pub fn probe_timeout(&self) -> Duration {
        self.capture_timeout * self.protocol.capture_multiplier()
    }

    /// What the probed stream must look like.
    pub fn expectation(&self) -> Expectation {
        let ratio = if self.protocol.is_segmented() {
            self.min_duration_ratio
        } else {
            DurationRatio::FULL
        };
        Expectation::new(self.probe_duration(), ratio, self.video_codec.clone())
    }

    /// Run the scenario to a verdict. Never panics on worker failure; all
    /// failures end up in the returned report.
    pub async fn run<F: WorkerFactory>(&self, factory: &F, parent: &Context) -> ScenarioReport {
        let started = Instant::now();
        let stream_id = new_stream_id();
        let (ctx, cancel) = Context::with_timeout(parent, self.timeout);

        info!(
            scenario = %self.name,
            protocol = %self.protocol,
            stream_id = %stream_id,
            timeout = ?self.timeout,
            "scenario starting"
        );

        let (ctx_err, observation, slots, probe) = match self.build::<F>(factory, &stream_id) {
            Ok(crew) => {
                let outcome = self.execute(crew, &ctx, &cancel).await;
                // every worker has exited; release the deadline watcher
                let ctx_err = ctx.err();
                cancel.cancel();
                (ctx_err, outcome.0, outcome.1, outcome.2)
            }
            Err((name, e)) => {
                cancel.cancel();
                (
                    None,
                    Observation::Interrupted,
                    vec![WorkerSlot::failed(name, e)],
                    None,
                )
            }
        };

        let mut probe_error = None;
        let mut verification = Vec::new();
        if observation == Observation::ProbeCompleted {
            match &probe {
                Some(output) => verification = verify::verify(output, &self.expectation()),
                None => probe_error = Some(ProbeError::MissingResult),
            }
        }

        let summaries = slots
            .iter()
            .map(|slot| SlotSummary {
                name: slot.name.clone(),
                error: slot.error.as_ref().map(ToString::to_string),
            })
            .collect::<Vec<_>>();

        record_metrics(self, &summaries, verification.len());

        let verdict = aggregate::aggregate(Evidence {
            ctx_err,
            observation,
            slots,
            probe_error,
            verification,
        });
        let elapsed = started.elapsed();

        match &verdict {
            Verdict::Failed(failure) => error!(
                scenario = %self.name,
                %observation,
                elapsed = ?elapsed,
                error = %failure,
                "scenario failed"
            ),
            _ => info!(
                scenario = %self.name,
                %observation,
                elapsed = ?elapsed,
                verdict = verdict.label(),
                probe = ?probe.as_ref().map(|p| p.result.to_string()),
                "scenario done"
            ),
        }

        metrics::counter!(
            m::SCENARIOS_TOTAL,
            m::LABEL_SCENARIO => self.name.clone(),
            m::LABEL_PROTOCOL => self.protocol.as_str(),
            m::LABEL_VERDICT => verdict.label(),
            m::LABEL_OBSERVATION => observation.as_str()
        )
        .increment(1);
        metrics::histogram!(
            m::SCENARIO_DURATION_SECONDS,
            m::LABEL_SCENARIO => self.name.clone()
        )
        .record(elapsed.as_secs_f64());

        ScenarioReport {
            name: self.name.clone(),
            protocol: self.protocol,
            stream_id,
            observation: Some(observation),
            verdict,
            slots: summaries,
            probe,
            elapsed,
        }
    }

    /// Construct the server, then derive publisher and prober settings from
    /// its ports and work dir.
    fn build<F: WorkerFactory>(
        &self,
        factory: &F,
        stream_id: &str,
    ) -> Result<Crew<F>, (&'static str, WorkerError)> {
        let server = factory
            .server(ServerSettings {
                envs: self.protocol.server_envs(),
            })
            .map_err(|e| ("server", e))?;

        let publish_url = protocol::publish_url(&self.host, server.rtmp_port(), stream_id);
        let publisher = factory
            .publisher(PublisherSettings {
                args: catalog::publish_args(&self.publish_input, &publish_url),
                stream_id: stream_id.to_owned(),
            })
            .map_err(|e| ("publisher", e))?;

        let prober = factory
            .prober(ProberSettings {
                stream_url: self.protocol.play_url(
                    &self.host,
                    server.rtmp_port(),
                    server.http_port(),
                    stream_id,
                ),
                dvr_file: server
                    .work_dir()
                    .join("objs")
                    .join(format!("srs-ffprobe-{stream_id}.ts")),
                duration: self.probe_duration(),
                timeout: self.probe_timeout(),
            })
            .map_err(|e| ("prober", e))?;

        Ok(Crew {
            server: Arc::new(server),
            publisher: Arc::new(publisher),
            prober: Arc::new(prober),
        })
    }

    async fn execute<F: WorkerFactory>(
        &self,
        crew: Crew<F>,
        ctx: &Context,
        cancel: &CancelHandle,
    ) -> (Observation, Vec<WorkerSlot>, Option<ProbeOutput>) {
        let server_ready = crew.server.ready().clone();
        let probe_done = crew.prober.probe_done().clone();

        let tasks = [
            spawn_worker(crew.server.clone(), None, ctx, cancel),
            spawn_worker(crew.publisher.clone(), Some(server_ready.clone()), ctx, cancel),
            spawn_worker(crew.prober.clone(), Some(server_ready), ctx, cancel),
        ];

        tokio::select! {
            biased;
            _ = ctx.done() => {}
            _ = probe_done.ready() => {}
        }

        let observation = Observation::classify(probe_done.is_ready(), ctx.err().as_ref());
        match observation {
            Observation::ProbeCompleted => {
                if cancel.cancel() {
                    info!(scenario = %self.name, "probe done, stopping workers");
                }
            }
            Observation::DeadlineExpired => {
                warn!(scenario = %self.name, timeout = ?self.timeout, "deadline expired before probe completed");
            }
            Observation::Interrupted => {
                warn!(scenario = %self.name, cause = ?ctx.err(), "scenario interrupted before probe completed");
            }
        }

        let mut slots = Vec::with_capacity(tasks.len());
        for (name, handle) in tasks {
            slots.push(join_slot(name, handle).await);
        }

        (observation, slots, crew.prober.result())
    }
}

/// Spawn `worker` on its own task, gated on `gate` when given.
///
/// The worker's `run` is only entered after the gate fired; if the scope
/// ends first the slot records the interruption instead.
fn spawn_worker(
    worker: Arc<dyn DynWorker>,
    gate: Option<ReadyGate>,
    ctx: &Context,
    cancel: &CancelHandle,
) -> (String, JoinHandle<Result<(), WorkerError>>) {
    let name = worker.name().to_owned();
    let ctx = ctx.clone();
    let cancel = cancel.for_worker(name.clone());
    let task_name = name.clone();

    let handle = tokio::spawn(async move {
        if let Some(gate) = gate {
            gate.wait(&ctx)
                .await
                .map_err(|source| WorkerError::Context {
                    worker: task_name,
                    source,
                })?;
        }
        worker.run(ctx, cancel).await
    });

    (name, handle)
}

async fn join_slot(name: String, handle: JoinHandle<Result<(), WorkerError>>) -> WorkerSlot {
    match handle.await {
        Ok(Ok(())) => WorkerSlot::ok(name),
        Ok(Err(e)) => WorkerSlot::failed(name, e),
        Err(join) => {
            let reason = join.to_string();
            WorkerSlot::failed(name.clone(), WorkerError::Aborted { worker: name, reason })
        }
    }
}

/// `stream-{pid}-{uuid}`; unique across concurrently running scenarios.
pub fn new_stream_id() -> String {
    format!("stream-{}-{}", std::process::id(), uuid::Uuid::new_v4().simple())
}

fn record_metrics(scenario: &Scenario, slots: &[SlotSummary], verify_errors: usize) {
    for slot in slots.iter().filter(|s| s.error.is_some()) {
        metrics::counter!(
            m::WORKER_ERRORS_TOTAL,
            m::LABEL_SCENARIO => scenario.name.clone(),
            m::LABEL_WORKER => slot.name.clone()
        )
        .increment(1);
    }
    if verify_errors > 0 {
        metrics::counter!(
            m::VERIFY_ERRORS_TOTAL,
            m::LABEL_SCENARIO => scenario.name.clone()
        )
        .increment(verify_errors as u64);
    }
}
