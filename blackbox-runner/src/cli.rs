//! CLI argument definitions for blackbox-runner.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Black-box harness for a streaming media server.
///
/// Starts the server, publishes an HEVC stream over RTMP, plays it back
/// over each delivery protocol and verifies what comes out.
#[derive(Parser, Debug)]
#[command(name = "blackbox-runner")]
#[command(version, about, long_about = None)]
pub struct RunnerCli {
    /// Path to blackbox.toml. Built-in defaults are used when the file
    /// does not exist.
    #[arg(short, long, default_value = "blackbox.toml")]
    pub config: PathBuf,

    /// Run only scenarios whose name contains one of these values
    /// (e.g. `hls`, `http-flv-hevc`). Repeatable.
    #[arg(short, long = "scenario")]
    pub scenarios: Vec<String>,

    /// List the selected scenarios and exit.
    #[arg(long)]
    pub list: bool,

    /// Print the suite summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Override the SRS working directory.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Override the per-scenario timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,
}
