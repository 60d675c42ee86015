//! FFmpeg capture + FFprobe worker.
//!
//! The prober records `duration` of the delivered stream into the DVR file
//! with ffmpeg, bounded by `timeout`, then runs ffprobe on the recording.
//! Once the parsed result is stored it fires `probe_done` and cancels the
//! scenario: the server and publisher have produced everything needed.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use blackbox_core::config::ProberConfig;
use blackbox_core::error::WorkerError;
use blackbox_core::probe::ProbeOutput;
use blackbox_core::worker::{ProberSettings, StreamProber, Worker};
use blackbox_core::{CancelHandle, Context, ReadyGate};
use tracing::{info, warn};

use crate::process::{self, ProcessExit, ProcessSpec};

const WORKER: &str = "prober";

/// How the capture phase ended.
enum Capture {
    /// The recording is on disk
    Recorded,
    /// The scenario ended first
    Abandoned,
}

#[derive(Debug)]
pub struct FfmpegProber {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    settings: ProberSettings,
    done: ReadyGate,
    output: OnceLock<ProbeOutput>,
}

impl FfmpegProber {
    pub fn new(config: &ProberConfig, settings: ProberSettings) -> Result<Self, WorkerError> {
        if settings.stream_url.is_empty() {
            return Err(WorkerError::Setup {
                worker: WORKER.to_owned(),
                reason: "empty stream url".to_owned(),
            });
        }
        if settings.duration.is_zero() {
            return Err(WorkerError::Setup {
                worker: WORKER.to_owned(),
                reason: "zero capture duration".to_owned(),
            });
        }
        Ok(Self {
            ffmpeg: config.ffmpeg_binary.clone(),
            ffprobe: config.ffprobe_binary.clone(),
            settings,
            done: ReadyGate::new(),
            output: OnceLock::new(),
        })
    }

    pub fn settings(&self) -> &ProberSettings {
        &self.settings
    }

    /// `ffmpeg` invocation recording the stream into the DVR file.
    pub fn capture_spec(&self) -> ProcessSpec {
        let dvr = &self.settings.dvr_file;
        ProcessSpec::new(WORKER, &self.ffmpeg)
            .args([
                "-y".to_owned(),
                "-i".to_owned(),
                self.settings.stream_url.clone(),
                "-c".to_owned(),
                "copy".to_owned(),
                "-t".to_owned(),
                format_secs(self.settings.duration),
                "-f".to_owned(),
                "mpegts".to_owned(),
                dvr.display().to_string(),
            ])
            .log_file(dvr.with_extension("log"))
    }

    /// `ffprobe` invocation printing the recording's format and streams as JSON.
    pub fn probe_spec(&self) -> ProcessSpec {
        ProcessSpec::new(WORKER, &self.ffprobe).args([
            "-show_error".to_owned(),
            "-show_private_data".to_owned(),
            "-v".to_owned(),
            "quiet".to_owned(),
            "-find_stream_info".to_owned(),
            "-print_format".to_owned(),
            "json".to_owned(),
            "-show_format".to_owned(),
            "-show_streams".to_owned(),
            self.settings.dvr_file.display().to_string(),
        ])
    }

    async fn capture(&self, ctx: &Context) -> Result<Capture, WorkerError> {
        if let Some(parent) = self.settings.dvr_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| WorkerError::Io {
                    worker: WORKER.to_owned(),
                    source,
                })?;
        }

        let (capture_ctx, capture_cancel) = Context::with_timeout(ctx, self.settings.timeout);
        let result =
            process::supervise(&self.capture_spec(), &capture_ctx, std::future::pending()).await;
        capture_cancel.cancel();

        match result? {
            ProcessExit::Exited(status) if status.success() => Ok(Capture::Recorded),
            ProcessExit::Exited(status) => Err(WorkerError::Exited {
                worker: WORKER.to_owned(),
                status: status.to_string(),
            }),
            ProcessExit::Stopped if ctx.is_done() => Ok(Capture::Abandoned),
            ProcessExit::Stopped => {
                warn!(
                    timeout = ?self.settings.timeout,
                    "capture timed out, probing what was recorded"
                );
                if has_recording(&self.settings.dvr_file).await {
                    Ok(Capture::Recorded)
                } else {
                    Err(WorkerError::Failed {
                        worker: WORKER.to_owned(),
                        reason: format!(
                            "nothing recorded from {} within {:?}",
                            self.settings.stream_url, self.settings.timeout
                        ),
                    })
                }
            }
        }
    }

    async fn probe(&self, ctx: &Context) -> Result<Option<ProbeOutput>, WorkerError> {
        let Some(out) = process::output(&self.probe_spec(), ctx).await? else {
            return Ok(None);
        };

        if !out.status.success() {
            return Err(WorkerError::Failed {
                worker: WORKER.to_owned(),
                reason: format!(
                    "ffprobe exited with {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stdout).trim()
                ),
            });
        }

        let raw = String::from_utf8_lossy(&out.stdout).into_owned();
        ProbeOutput::parse(raw)
            .map(Some)
            .map_err(|e| WorkerError::Failed {
                worker: WORKER.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn capture_and_probe(&self, ctx: &Context) -> Result<Option<ProbeOutput>, WorkerError> {
        match self.capture(ctx).await? {
            Capture::Abandoned => Ok(None),
            Capture::Recorded => self.probe(ctx).await,
        }
    }
}

impl Worker for FfmpegProber {
    fn name(&self) -> &str {
        WORKER
    }

    async fn run(&self, ctx: Context, cancel: CancelHandle) -> Result<(), WorkerError> {
        let output = match self.capture_and_probe(&ctx).await {
            Ok(Some(output)) => output,
            Ok(None) => return Ok(()),
            Err(e) => {
                cancel.cancel();
                return Err(e);
            }
        };

        info!(url = %self.settings.stream_url, result = %output.result, "probe completed");
        // the result is stored before the gate fires
        let _ = self.output.set(output);
        self.done.fire();
        cancel.cancel();
        Ok(())
    }
}

impl StreamProber for FfmpegProber {
    fn probe_done(&self) -> &ReadyGate {
        &self.done
    }

    fn result(&self) -> Option<ProbeOutput> {
        self.output.get().cloned()
    }
}

fn format_secs(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}

async fn has_recording(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}
