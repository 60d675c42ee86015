//! Child-process supervision shared by every process-backed worker.
//!
//! A [`ProcessSpec`] describes the command line; [`supervise`] runs it until
//! either the scope is done (the child is killed and reaped) or the child
//! exits on its own. Workers map the [`ProcessExit`] onto their contract:
//! stopping because the scope ended is `Ok`, exiting on its own fires the
//! worker's cancel handle.

use std::fmt;
use std::fs::{self, File};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};

use blackbox_core::Context;
use blackbox_core::error::WorkerError;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// How a supervised child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// The scope ended; the child was killed and reaped.
    Stopped,
    /// The child exited by itself.
    Exited(ExitStatus),
}

/// Command line, environment and log destination of a child process.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    worker: String,
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(worker: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            worker: worker.into(),
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
            log_file: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Add `KEY=value` pairs. Entries without `=` are rejected.
    pub fn env_pairs<'a, I>(mut self, pairs: I) -> Result<Self, WorkerError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(WorkerError::Setup {
                    worker: self.worker.clone(),
                    reason: format!("'{pair}' is not a KEY=value pair"),
                });
            };
            self.envs.push((key.to_owned(), value.to_owned()));
        }
        Ok(self)
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Send stdout and stderr to `path` (created with its parent directories).
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Spawn the child with `kill_on_drop` so an abandoned task never leaks it.
    pub fn spawn(&self) -> Result<Child, WorkerError> {
        let mut command = self.command()?;
        command.stdin(Stdio::null());
        command.spawn().map_err(|source| WorkerError::Spawn {
            worker: self.worker.clone(),
            source,
        })
    }

    fn command(&self) -> Result<Command, WorkerError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        match &self.log_file {
            Some(path) => {
                let (stdout, stderr) = self.open_log(path)?;
                command.stdout(stdout).stderr(stderr);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }
        Ok(command)
    }

    fn open_log(&self, path: &Path) -> Result<(Stdio, Stdio), WorkerError> {
        let io_err = |source| WorkerError::Io {
            worker: self.worker.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        let dup = file.try_clone().map_err(io_err)?;
        Ok((Stdio::from(file), Stdio::from(dup)))
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Resolve `program` against `work_dir` when it is a relative path such as
/// `./objs/srs`. Bare names are left for `PATH` lookup.
///
/// The result is absolute, so it names the same file whether or not the
/// child is started with `work_dir` as its current directory.
pub fn resolve_program(work_dir: &Path, program: &Path) -> PathBuf {
    if program.is_relative() && program.components().count() > 1 {
        let joined = work_dir.join(program);
        std::path::absolute(&joined).unwrap_or(joined)
    } else {
        program.to_path_buf()
    }
}

/// Run `spec` until `ctx` is done or the child exits.
///
/// `sidecar` is polled alongside the child until it completes; the server
/// uses it for its readiness probe. It is dropped when the child ends.
pub async fn supervise<F>(
    spec: &ProcessSpec,
    ctx: &Context,
    sidecar: F,
) -> Result<ProcessExit, WorkerError>
where
    F: Future<Output = ()>,
{
    if ctx.is_done() {
        return Ok(ProcessExit::Stopped);
    }

    let mut child = spec.spawn()?;
    info!(worker = spec.worker(), pid = child.id(), command = %spec, "process started");

    tokio::pin!(sidecar);
    let mut sidecar_pending = true;

    loop {
        tokio::select! {
            biased;
            _ = ctx.done() => {
                stop(&mut child, spec.worker()).await?;
                return Ok(ProcessExit::Stopped);
            }
            status = child.wait() => {
                let status = status.map_err(|source| WorkerError::Io {
                    worker: spec.worker().to_owned(),
                    source,
                })?;
                info!(worker = spec.worker(), %status, "process exited");
                return Ok(ProcessExit::Exited(status));
            }
            _ = &mut sidecar, if sidecar_pending => {
                sidecar_pending = false;
            }
        }
    }
}

/// Run `spec` to completion and collect its output, or `None` if `ctx`
/// ended first (the child is killed on drop).
pub async fn output(spec: &ProcessSpec, ctx: &Context) -> Result<Option<Output>, WorkerError> {
    let mut command = spec.command()?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(worker = spec.worker(), command = %spec, "running to completion");
    tokio::select! {
        biased;
        _ = ctx.done() => Ok(None),
        result = command.output() => result
            .map(Some)
            .map_err(|source| WorkerError::Spawn {
                worker: spec.worker().to_owned(),
                source,
            }),
    }
}

/// Kill and reap `child`.
async fn stop(child: &mut Child, worker: &str) -> Result<(), WorkerError> {
    if let Err(e) = child.start_kill() {
        // already reaped; wait() below returns the cached status
        debug!(worker, error = %e, "kill skipped");
    }
    match child.wait().await {
        Ok(status) => {
            debug!(worker, %status, "process stopped");
            Ok(())
        }
        Err(source) => {
            warn!(worker, error = %source, "failed to reap process");
            Err(WorkerError::Io {
                worker: worker.to_owned(),
                source,
            })
        }
    }
}
