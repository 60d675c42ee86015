//! Process-backed workers for the blackbox harness.
//!
//! Each worker owns one external process and implements the lifecycle
//! traits from `blackbox-core`:
//!
//! - [`SrsServer`]: the media server under test ([`MediaServer`])
//! - [`FfmpegPublisher`]: pushes the encoded input over RTMP ([`Worker`])
//! - [`FfmpegProber`]: captures the delivered stream and runs ffprobe on
//!   it ([`StreamProber`])
//!
//! [`ProcessWorkerFactory`] builds all three from a [`BlackboxConfig`];
//! [`preflight`] decides whether the host can run scenarios at all.
//!
//! [`MediaServer`]: blackbox_core::MediaServer
//! [`Worker`]: blackbox_core::Worker
//! [`StreamProber`]: blackbox_core::StreamProber
//! [`BlackboxConfig`]: blackbox_core::BlackboxConfig

pub mod factory;
pub mod preflight;
pub mod process;
pub mod prober;
pub mod publisher;
pub mod server;

pub use factory::ProcessWorkerFactory;
pub use preflight::{SkipReason, preflight};
pub use process::{ProcessExit, ProcessSpec};
pub use prober::FfmpegProber;
pub use publisher::FfmpegPublisher;
pub use server::SrsServer;
