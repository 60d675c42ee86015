//! FFmpeg publisher worker.

use std::path::{Path, PathBuf};

use blackbox_core::config::PublisherConfig;
use blackbox_core::error::WorkerError;
use blackbox_core::worker::{PublisherSettings, Worker};
use blackbox_core::{CancelHandle, Context};
use tracing::warn;

use crate::process::{self, ProcessExit, ProcessSpec};

const WORKER: &str = "publisher";

/// Pushes the input file into the server; expected to run until the scope ends.
#[derive(Debug)]
pub struct FfmpegPublisher {
    binary: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
    log_file: PathBuf,
}

impl FfmpegPublisher {
    pub fn new(
        config: &PublisherConfig,
        work_dir: &Path,
        settings: PublisherSettings,
    ) -> Result<Self, WorkerError> {
        if settings.args.is_empty() {
            return Err(WorkerError::Setup {
                worker: WORKER.to_owned(),
                reason: "empty argument list".to_owned(),
            });
        }
        if settings.stream_id.is_empty() {
            return Err(WorkerError::Setup {
                worker: WORKER.to_owned(),
                reason: "missing stream id".to_owned(),
            });
        }
        let work_dir = std::path::absolute(work_dir).map_err(|source| WorkerError::Io {
            worker: WORKER.to_owned(),
            source,
        })?;
        Ok(Self {
            binary: process::resolve_program(&work_dir, &config.binary),
            args: settings.args,
            log_file: work_dir
                .join("objs")
                .join(format!("ffmpeg-publisher-{}.log", settings.stream_id)),
            work_dir,
        })
    }

    pub fn spec(&self) -> ProcessSpec {
        ProcessSpec::new(WORKER, &self.binary)
            .args(self.args.iter().cloned())
            .current_dir(&self.work_dir)
            .log_file(&self.log_file)
    }
}

impl Worker for FfmpegPublisher {
    fn name(&self) -> &str {
        WORKER
    }

    async fn run(&self, ctx: Context, cancel: CancelHandle) -> Result<(), WorkerError> {
        let result = process::supervise(&self.spec(), &ctx, std::future::pending()).await;

        // any exit before the scope ends starves the prober
        let status = match result {
            Ok(ProcessExit::Stopped) => return Ok(()),
            Ok(ProcessExit::Exited(status)) => status,
            Err(e) => {
                cancel.cancel();
                return Err(e);
            }
        };

        warn!(%status, "publisher stopped before the scenario ended");
        cancel.cancel();
        Err(WorkerError::Exited {
            worker: WORKER.to_owned(),
            status: status.to_string(),
        })
    }
}
