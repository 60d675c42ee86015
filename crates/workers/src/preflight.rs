//! Environment checks run before any scenario.
//!
//! A failed check is not a test failure: the scenario is skipped with the
//! returned reason.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use blackbox_core::BlackboxConfig;
use tokio::process::Command;
use tracing::debug;

use crate::process::resolve_program;

/// Why scenarios cannot run on this host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// Publishing HEVC over RTMP with ffmpeg is unavailable on this platform
    #[error("unsupported platform: {os}")]
    UnsupportedPlatform { os: String },

    #[error("{tool} is not runnable at {}: {reason}", path.display())]
    MissingBinary {
        tool: String,
        path: PathBuf,
        reason: String,
    },

    #[error("publish input {} not found", path.display())]
    MissingInput { path: PathBuf },
}

/// Check the platform, the three binaries and the publish input.
pub async fn preflight(config: &BlackboxConfig) -> Result<(), SkipReason> {
    check_platform(std::env::consts::OS)?;

    let work_dir = &config.server.work_dir;
    check_binary("srs", &resolve_program(work_dir, &config.server.binary), "-v").await?;
    check_binary(
        "publisher ffmpeg",
        &resolve_program(work_dir, &config.publisher.binary),
        "-version",
    )
    .await?;
    check_binary("capture ffmpeg", &config.prober.ffmpeg_binary, "-version").await?;
    check_binary("ffprobe", &config.prober.ffprobe_binary, "-version").await?;

    let input = work_dir.join(&config.publisher.input);
    match tokio::fs::try_exists(&input).await {
        Ok(true) => Ok(()),
        _ => Err(SkipReason::MissingInput { path: input }),
    }
}

fn check_platform(os: &str) -> Result<(), SkipReason> {
    if os == "macos" {
        return Err(SkipReason::UnsupportedPlatform { os: os.to_owned() });
    }
    Ok(())
}

/// The binary is considered available when it can be spawned at all; some
/// builds exit non-zero for version flags.
async fn check_binary(tool: &str, path: &Path, version_flag: &str) -> Result<(), SkipReason> {
    let status = Command::new(path)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;

    match status {
        Ok(status) => {
            debug!(tool, path = %path.display(), %status, "binary available");
            Ok(())
        }
        Err(e) => Err(SkipReason::MissingBinary {
            tool: tool.to_owned(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
