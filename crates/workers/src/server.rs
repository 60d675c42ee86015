//! SRS media server worker.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blackbox_core::config::ServerConfig;
use blackbox_core::error::WorkerError;
use blackbox_core::worker::{MediaServer, ServerSettings, Worker};
use blackbox_core::{CancelHandle, Context, ReadyGate};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::process::{self, ProcessExit, ProcessSpec};

const WORKER: &str = "server";

/// Listening ports handed to one server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPorts {
    pub rtmp: u16,
    pub http: u16,
    pub api: u16,
}

impl ServerPorts {
    /// Ask the OS for three distinct free ports.
    pub fn allocate() -> Result<Self, WorkerError> {
        // hold all three listeners so the OS cannot hand out the same port twice
        let listeners = (0..3)
            .map(|_| TcpListener::bind("127.0.0.1:0"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| WorkerError::Io {
                worker: WORKER.to_owned(),
                source,
            })?;

        let mut ports = [0u16; 3];
        for (slot, listener) in ports.iter_mut().zip(&listeners) {
            *slot = listener
                .local_addr()
                .map_err(|source| WorkerError::Io {
                    worker: WORKER.to_owned(),
                    source,
                })?
                .port();
        }

        Ok(Self {
            rtmp: ports[0],
            http: ports[1],
            api: ports[2],
        })
    }
}

/// The server under test, run as a child process.
///
/// Ports are allocated when the worker is built so that publisher and
/// prober URLs can be derived before anything starts. Readiness fires once
/// the RTMP port accepts TCP connections.
#[derive(Debug)]
pub struct SrsServer {
    binary: PathBuf,
    config_file: PathBuf,
    work_dir: PathBuf,
    host: String,
    ports: ServerPorts,
    envs: Vec<String>,
    poll_interval: Duration,
    ready: ReadyGate,
}

impl SrsServer {
    pub fn new(config: &ServerConfig, settings: ServerSettings) -> Result<Self, WorkerError> {
        // the child runs inside work_dir; every path derived from it must
        // survive that chdir
        let work_dir = std::path::absolute(&config.work_dir).map_err(|source| WorkerError::Io {
            worker: WORKER.to_owned(),
            source,
        })?;
        let ports = ServerPorts::allocate()?;
        let mut envs = config.envs.clone();
        envs.extend(settings.envs);

        Ok(Self {
            binary: config.binary.clone(),
            config_file: config.config_file.clone(),
            work_dir,
            host: config.host.clone(),
            ports,
            envs,
            poll_interval: config.ready_poll_interval(),
            ready: ReadyGate::new(),
        })
    }

    pub fn ports(&self) -> ServerPorts {
        self.ports
    }

    /// The process description: base toggles first, scenario envs last so
    /// they take precedence.
    pub fn spec(&self) -> Result<ProcessSpec, WorkerError> {
        let log_file = self
            .work_dir
            .join("objs")
            .join(format!("srs-blackbox-{}.log", self.ports.rtmp));
        let pid_file = format!("objs/srs-blackbox-{}.pid", self.ports.rtmp);

        ProcessSpec::new(WORKER, process::resolve_program(&self.work_dir, &self.binary))
            .args(["-c".to_owned(), self.config_file.display().to_string()])
            .current_dir(&self.work_dir)
            .log_file(log_file)
            .env("SRS_LISTEN", self.ports.rtmp.to_string())
            .env("SRS_HTTP_SERVER_LISTEN", self.ports.http.to_string())
            .env("SRS_HTTP_API_LISTEN", self.ports.api.to_string())
            .env("SRS_PID", pid_file)
            .env("SRS_DAEMON", "off")
            .env("SRS_LOG_TANK", "console")
            .env_pairs(&self.envs)
    }
}

impl Worker for SrsServer {
    fn name(&self) -> &str {
        WORKER
    }

    async fn run(&self, ctx: Context, cancel: CancelHandle) -> Result<(), WorkerError> {
        let spec = self.spec()?;
        let addr = format!("{}:{}", self.host, self.ports.rtmp);
        let readiness = wait_accepting(&addr, self.poll_interval, &self.ready);

        match process::supervise(&spec, &ctx, readiness).await {
            Ok(ProcessExit::Stopped) => Ok(()),
            Ok(ProcessExit::Exited(status)) => {
                cancel.cancel();
                Err(WorkerError::Exited {
                    worker: WORKER.to_owned(),
                    status: status.to_string(),
                })
            }
            Err(e) => {
                cancel.cancel();
                Err(e)
            }
        }
    }
}

impl MediaServer for SrsServer {
    fn ready(&self) -> &ReadyGate {
        &self.ready
    }

    fn rtmp_port(&self) -> u16 {
        self.ports.rtmp
    }

    fn http_port(&self) -> u16 {
        self.ports.http
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Poll `addr` until it accepts a connection, then fire `gate`.
async fn wait_accepting(addr: &str, interval: Duration, gate: &ReadyGate) {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match TcpStream::connect(addr).await {
            Ok(_) => {
                gate.fire();
                info!(addr, attempts, "server accepting connections");
                return;
            }
            Err(e) => {
                debug!(addr, attempts, error = %e, "server not accepting yet");
                tokio::time::sleep(interval).await;
            }
        }
    }
}
