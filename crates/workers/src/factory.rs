//! Builds process-backed workers from configuration.

use std::sync::Arc;

use blackbox_core::BlackboxConfig;
use blackbox_core::error::WorkerError;
use blackbox_core::worker::{PublisherSettings, ProberSettings, ServerSettings, WorkerFactory};

use crate::prober::FfmpegProber;
use crate::publisher::FfmpegPublisher;
use crate::server::SrsServer;

/// [`WorkerFactory`] producing real SRS/FFmpeg processes.
#[derive(Debug, Clone)]
pub struct ProcessWorkerFactory {
    config: Arc<BlackboxConfig>,
}

impl ProcessWorkerFactory {
    pub fn new(config: Arc<BlackboxConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BlackboxConfig {
        &self.config
    }
}

impl WorkerFactory for ProcessWorkerFactory {
    type Server = SrsServer;
    type Publisher = FfmpegPublisher;
    type Prober = FfmpegProber;

    fn server(&self, settings: ServerSettings) -> Result<SrsServer, WorkerError> {
        SrsServer::new(&self.config.server, settings)
    }

    fn publisher(&self, settings: PublisherSettings) -> Result<FfmpegPublisher, WorkerError> {
        FfmpegPublisher::new(&self.config.publisher, &self.config.server.work_dir, settings)
    }

    fn prober(&self, settings: ProberSettings) -> Result<FfmpegProber, WorkerError> {
        FfmpegProber::new(&self.config.prober, settings)
    }
}
