//! Test scenario builder.

use std::path::PathBuf;
use std::time::Duration;

use blackbox_core::protocol::DeliveryProtocol;
use blackbox_core::verify::DurationRatio;
use blackbox_runner::scenario::Scenario;

/// Builder for [`Scenario`] values with short, test-friendly limits.
///
/// Defaults: RTMP, 10s scenario timeout, 3s capture, 1/3 segmented ratio,
/// expecting HEVC.
#[allow(dead_code)]
pub struct TestScenarioBuilder {
    scenario: Scenario,
}

#[allow(dead_code)]
impl TestScenarioBuilder {
    pub fn new() -> Self {
        Self {
            scenario: Scenario {
                name: "test-hevc".to_owned(),
                protocol: DeliveryProtocol::Rtmp,
                host: "localhost".to_owned(),
                publish_input: PathBuf::from("avatar.flv"),
                timeout: Duration::from_secs(10),
                capture: Duration::from_secs(3),
                capture_timeout: Duration::from_secs(5),
                min_duration_ratio: DurationRatio::ONE_THIRD,
                video_codec: "hevc".to_owned(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.scenario.name = name.to_owned();
        self
    }

    pub fn protocol(mut self, protocol: DeliveryProtocol) -> Self {
        self.scenario.protocol = protocol;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.scenario.timeout = timeout;
        self
    }

    pub fn capture(mut self, capture: Duration) -> Self {
        self.scenario.capture = capture;
        self
    }

    pub fn ratio(mut self, ratio: DurationRatio) -> Self {
        self.scenario.min_duration_ratio = ratio;
        self
    }

    pub fn video_codec(mut self, codec: &str) -> Self {
        self.scenario.video_codec = codec.to_owned();
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}
