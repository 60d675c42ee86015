//! Mock workers with scripted behavior.
//!
//! Each mock follows the worker contract the real process workers follow:
//! return promptly once the context is done, and fire the cancel handle when
//! stopping on its own. Start instants and the settings handed to the
//! factory are captured in a shared [`Recorder`] for later assertions.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use blackbox_core::error::WorkerError;
use blackbox_core::probe::ProbeOutput;
use blackbox_core::worker::{
    MediaServer, ProberSettings, PublisherSettings, ServerSettings, StreamProber, Worker,
    WorkerFactory,
};
use blackbox_core::{CancelHandle, Context, ReadyGate};
use tokio::time::Instant;

const RTMP_PORT: u16 = 19350;
const HTTP_PORT: u16 = 18080;

/// How the mock server behaves once running.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ServerBehavior {
    /// Accepts connections after the delay, then runs until stopped
    Healthy { ready_after: Duration },
    /// Never becomes ready
    NeverReady,
    /// Becomes ready immediately, then exits on its own after the delay
    CrashesAfter(Duration),
}

/// How the mock publisher behaves once started.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum PublisherBehavior {
    /// Streams until stopped, reporting the interruption as its error
    Streams,
    /// Fails on its own after the delay
    FailsAfter(Duration),
}

/// How the mock prober behaves once started.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ProberBehavior {
    /// Produces `output` after the delay
    Completes { after: Duration, output: ProbeOutput },
    /// Signals completion after the delay without storing a result
    CompletesWithoutResult { after: Duration },
    /// Never produces anything
    Hangs,
    /// Fails on its own after the delay
    FailsAfter(Duration),
}

/// Observations shared between a [`MockFactory`] and the test.
#[derive(Debug, Default)]
pub struct Recorder {
    starts: Mutex<Vec<(String, Instant)>>,
    server_gates: Mutex<Vec<ReadyGate>>,
    publisher_settings: Mutex<Vec<PublisherSettings>>,
    prober_settings: Mutex<Vec<ProberSettings>>,
    server_settings: Mutex<Vec<ServerSettings>>,
}

#[allow(dead_code)]
impl Recorder {
    fn started(&self, worker: &str) {
        self.starts
            .lock()
            .unwrap()
            .push((worker.to_owned(), Instant::now()));
    }

    /// Workers whose `run` was entered, with the instant it was.
    pub fn starts(&self) -> Vec<(String, Instant)> {
        self.starts.lock().unwrap().clone()
    }

    /// The start instant of the first worker named `worker`.
    pub fn started_at(&self, worker: &str) -> Option<Instant> {
        self.starts()
            .into_iter()
            .find(|(name, _)| name == worker)
            .map(|(_, at)| at)
    }

    /// Readiness gates of every server built so far.
    pub fn server_gates(&self) -> Vec<ReadyGate> {
        self.server_gates.lock().unwrap().clone()
    }

    pub fn publisher_settings(&self) -> Vec<PublisherSettings> {
        self.publisher_settings.lock().unwrap().clone()
    }

    pub fn prober_settings(&self) -> Vec<ProberSettings> {
        self.prober_settings.lock().unwrap().clone()
    }

    pub fn server_settings(&self) -> Vec<ServerSettings> {
        self.server_settings.lock().unwrap().clone()
    }
}

// -- server --

pub struct MockServer {
    behavior: ServerBehavior,
    ready: ReadyGate,
    work_dir: PathBuf,
    recorder: Arc<Recorder>,
}

impl Worker for MockServer {
    fn name(&self) -> &str {
        "server"
    }

    async fn run(&self, ctx: Context, cancel: CancelHandle) -> Result<(), WorkerError> {
        self.recorder.started("server");
        match &self.behavior {
            ServerBehavior::Healthy { ready_after } => {
                tokio::select! {
                    biased;
                    _ = ctx.done() => return Ok(()),
                    _ = tokio::time::sleep(*ready_after) => {}
                }
                self.ready.fire();
                ctx.done().await;
                Ok(())
            }
            ServerBehavior::NeverReady => {
                ctx.done().await;
                Ok(())
            }
            ServerBehavior::CrashesAfter(after) => {
                self.ready.fire();
                tokio::select! {
                    biased;
                    _ = ctx.done() => Ok(()),
                    _ = tokio::time::sleep(*after) => {
                        cancel.cancel();
                        Err(WorkerError::Exited {
                            worker: "server".to_owned(),
                            status: "exit status: 1".to_owned(),
                        })
                    }
                }
            }
        }
    }
}

impl MediaServer for MockServer {
    fn ready(&self) -> &ReadyGate {
        &self.ready
    }

    fn rtmp_port(&self) -> u16 {
        RTMP_PORT
    }

    fn http_port(&self) -> u16 {
        HTTP_PORT
    }

    fn work_dir(&self) -> &std::path::Path {
        &self.work_dir
    }
}

// -- publisher --

pub struct MockPublisher {
    behavior: PublisherBehavior,
    recorder: Arc<Recorder>,
}

impl Worker for MockPublisher {
    fn name(&self) -> &str {
        "publisher"
    }

    async fn run(&self, ctx: Context, cancel: CancelHandle) -> Result<(), WorkerError> {
        self.recorder.started("publisher");
        match &self.behavior {
            PublisherBehavior::Streams => {
                ctx.done().await;
                match ctx.err() {
                    Some(source) => Err(WorkerError::Context {
                        worker: "publisher".to_owned(),
                        source,
                    }),
                    None => Ok(()),
                }
            }
            PublisherBehavior::FailsAfter(after) => {
                tokio::select! {
                    biased;
                    _ = ctx.done() => Ok(()),
                    _ = tokio::time::sleep(*after) => {
                        cancel.cancel();
                        Err(WorkerError::Failed {
                            worker: "publisher".to_owned(),
                            reason: "connection refused".to_owned(),
                        })
                    }
                }
            }
        }
    }
}

// -- prober --

pub struct MockProber {
    behavior: ProberBehavior,
    done: ReadyGate,
    result: OnceLock<ProbeOutput>,
    recorder: Arc<Recorder>,
}

impl MockProber {
    async fn sleep_or_done(ctx: &Context, after: Duration) -> bool {
        tokio::select! {
            biased;
            _ = ctx.done() => false,
            _ = tokio::time::sleep(after) => true,
        }
    }
}

impl Worker for MockProber {
    fn name(&self) -> &str {
        "prober"
    }

    async fn run(&self, ctx: Context, cancel: CancelHandle) -> Result<(), WorkerError> {
        self.recorder.started("prober");
        match &self.behavior {
            ProberBehavior::Completes { after, output } => {
                if !Self::sleep_or_done(&ctx, *after).await {
                    return Ok(());
                }
                let _ = self.result.set(output.clone());
                self.done.fire();
                cancel.cancel();
                Ok(())
            }
            ProberBehavior::CompletesWithoutResult { after } => {
                if !Self::sleep_or_done(&ctx, *after).await {
                    return Ok(());
                }
                self.done.fire();
                cancel.cancel();
                Ok(())
            }
            ProberBehavior::Hangs => {
                ctx.done().await;
                Ok(())
            }
            ProberBehavior::FailsAfter(after) => {
                if !Self::sleep_or_done(&ctx, *after).await {
                    return Ok(());
                }
                cancel.cancel();
                Err(WorkerError::Failed {
                    worker: "prober".to_owned(),
                    reason: "capture produced an empty file".to_owned(),
                })
            }
        }
    }
}

impl StreamProber for MockProber {
    fn probe_done(&self) -> &ReadyGate {
        &self.done
    }

    fn result(&self) -> Option<ProbeOutput> {
        self.result.get().cloned()
    }
}

// -- factory --

/// [`WorkerFactory`] handing out mocks with the configured behaviors.
pub struct MockFactory {
    pub server: ServerBehavior,
    pub publisher: PublisherBehavior,
    pub prober: ProberBehavior,
    /// Name of the worker whose construction fails, if any
    pub fail_build: Option<&'static str>,
    pub work_dir: PathBuf,
    pub recorder: Arc<Recorder>,
}

#[allow(dead_code)]
impl MockFactory {
    /// A healthy crew: server ready after 100ms, prober completing with
    /// `output` after `probe_after`.
    pub fn healthy(output: ProbeOutput, probe_after: Duration) -> Self {
        Self {
            server: ServerBehavior::Healthy {
                ready_after: Duration::from_millis(100),
            },
            publisher: PublisherBehavior::Streams,
            prober: ProberBehavior::Completes {
                after: probe_after,
                output,
            },
            fail_build: None,
            work_dir: PathBuf::from("/tmp/blackbox-e2e"),
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub fn with_server(mut self, behavior: ServerBehavior) -> Self {
        self.server = behavior;
        self
    }

    pub fn with_publisher(mut self, behavior: PublisherBehavior) -> Self {
        self.publisher = behavior;
        self
    }

    pub fn with_prober(mut self, behavior: ProberBehavior) -> Self {
        self.prober = behavior;
        self
    }

    pub fn failing_build(mut self, worker: &'static str) -> Self {
        self.fail_build = Some(worker);
        self
    }

    fn check_build(&self, worker: &str) -> Result<(), WorkerError> {
        if self.fail_build == Some(worker) {
            return Err(WorkerError::Setup {
                worker: worker.to_owned(),
                reason: "scripted build failure".to_owned(),
            });
        }
        Ok(())
    }
}

impl WorkerFactory for MockFactory {
    type Server = MockServer;
    type Publisher = MockPublisher;
    type Prober = MockProber;

    fn server(&self, settings: ServerSettings) -> Result<MockServer, WorkerError> {
        self.check_build("server")?;
        self.recorder.server_settings.lock().unwrap().push(settings);
        let ready = ReadyGate::new();
        self.recorder
            .server_gates
            .lock()
            .unwrap()
            .push(ready.clone());
        Ok(MockServer {
            behavior: self.server.clone(),
            ready,
            work_dir: self.work_dir.clone(),
            recorder: self.recorder.clone(),
        })
    }

    fn publisher(&self, settings: PublisherSettings) -> Result<MockPublisher, WorkerError> {
        self.check_build("publisher")?;
        self.recorder
            .publisher_settings
            .lock()
            .unwrap()
            .push(settings);
        Ok(MockPublisher {
            behavior: self.publisher.clone(),
            recorder: self.recorder.clone(),
        })
    }

    fn prober(&self, settings: ProberSettings) -> Result<MockProber, WorkerError> {
        self.check_build("prober")?;
        self.recorder.prober_settings.lock().unwrap().push(settings);
        Ok(MockProber {
            behavior: self.prober.clone(),
            done: ReadyGate::new(),
            result: OnceLock::new(),
            recorder: self.recorder.clone(),
        })
    }
}
