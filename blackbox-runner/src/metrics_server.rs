//! Prometheus metrics exporter.
//!
//! Scenarios record through the `metrics` facade; nothing is collected
//! unless [`install_metrics_recorder`] ran.

use std::net::SocketAddr;

use anyhow::Result;
use blackbox_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global recorder and start the `/metrics` HTTP listener.
///
/// # Errors
///
/// - invalid listen address
/// - socket binding fails or a recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    for (name, description) in blackbox_core::metrics::ALL {
        if name.ends_with("_seconds") {
            metrics::describe_histogram!(name, metrics::Unit::Seconds, description);
        } else {
            metrics::describe_counter!(name, description);
        }
    }

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}
