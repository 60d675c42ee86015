//! Built-in scenarios: RTMP publish with HEVC, played back over every
//! delivery protocol.

use std::path::Path;

use blackbox_core::BlackboxConfig;
use blackbox_core::protocol::DeliveryProtocol;

use crate::scenario::Scenario;

/// Name of the HEVC scenario for `protocol`.
pub fn hevc_name(protocol: DeliveryProtocol) -> String {
    format!("{}-hevc", protocol.as_str())
}

/// ffmpeg arguments looping `input` at native rate, re-encoding video to
/// HEVC with the fastest x265 preset and copying audio.
pub fn publish_args(input: &Path, publish_url: &str) -> Vec<String> {
    let input = input.display().to_string();
    [
        "-stream_loop",
        "-1",
        "-re",
        "-i",
        input.as_str(),
        "-acodec",
        "copy",
        "-vcodec",
        "libx265",
        "-profile:v",
        "main",
        "-preset",
        "ultrafast",
        "-f",
        "flv",
        publish_url,
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// One HEVC scenario per delivery protocol, in [`DeliveryProtocol::ALL`] order.
pub fn hevc_scenarios(config: &BlackboxConfig) -> Vec<Scenario> {
    DeliveryProtocol::ALL
        .into_iter()
        .map(|protocol| Scenario {
            name: hevc_name(protocol),
            protocol,
            host: config.server.host.clone(),
            publish_input: config.publisher.input.clone(),
            timeout: config.scenario.timeout(),
            capture: config.prober.duration(),
            capture_timeout: config.prober.timeout(),
            min_duration_ratio: config.scenario.segmented_min_duration,
            video_codec: config.scenario.video_codec.clone(),
        })
        .collect()
}

/// Keep the scenarios whose name contains any of `filters`; all of them
/// when `filters` is empty.
pub fn select(scenarios: Vec<Scenario>, filters: &[String]) -> Vec<Scenario> {
    if filters.is_empty() {
        return scenarios;
    }
    scenarios
        .into_iter()
        .filter(|s| filters.iter().any(|f| s.name.contains(f.as_str())))
        .collect()
}
