//! 결과 검증 — 프로브 결과를 위반 목록으로 변환
//!
//! 모든 검사는 독립적으로 실행되므로 한 번에 여러 문제를 보고할 수 있습니다.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VerifyError;
use crate::probe::ProbeOutput;

/// 명목 프로브 길이에 적용하는 비율
///
/// 정수 나노초로 계산하므로 (`nominal * numerator / denominator`)
/// 임계값과 정확히 같은 결과는 통과합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl DurationRatio {
    /// 명목 길이 전체
    pub const FULL: Self = Self {
        numerator: 1,
        denominator: 1,
    };

    /// 세그먼트 전송은 프로빙 시점에 스트림 일부만 노출할 수 있음
    pub const ONE_THIRD: Self = Self {
        numerator: 1,
        denominator: 3,
    };

    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// 비율 적용. 분모 0은 설정 검증에서 거부되며,
    /// 여기서는 명목 길이를 그대로 반환합니다.
    pub fn apply(&self, nominal: Duration) -> Duration {
        if self.denominator == 0 {
            return nominal;
        }
        let nanos = nominal.as_nanos() * u128::from(self.numerator) / u128::from(self.denominator);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl Default for DurationRatio {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for DurationRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// 왕복한 스트림에 대한 시나리오의 기대값
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// 정확한 스트림 수 (오디오 1 + 비디오 1)
    pub stream_count: usize,
    /// 프로빙된 길이의 하한
    pub min_duration: Duration,
    /// 비디오 스트림의 ffprobe 코덱 이름 (대소문자 구분)
    pub video_codec: String,
}

impl Expectation {
    pub const AV_STREAMS: usize = 2;

    /// 길이가 `nominal * ratio` 이상인 오디오+비디오 스트림 기대
    pub fn new(nominal: Duration, ratio: DurationRatio, video_codec: impl Into<String>) -> Self {
        Self {
            stream_count: Self::AV_STREAMS,
            min_duration: ratio.apply(nominal),
            video_codec: video_codec.into(),
        }
    }
}

/// `output`을 `expected`와 비교. 빈 벡터면 유효한 스트림
pub fn verify(output: &ProbeOutput, expected: &Expectation) -> Vec<VerifyError> {
    let result = &output.result;
    let summary = result.to_string();
    let raw = output.raw.clone();
    let mut errors = Vec::new();

    if result.streams.len() != expected.stream_count {
        errors.push(VerifyError::InvalidStreams {
            actual: result.streams.len(),
            expected: expected.stream_count,
            summary: summary.clone(),
            raw: raw.clone(),
        });
    }

    if result.duration < expected.min_duration {
        errors.push(VerifyError::ShortDuration {
            actual: result.duration,
            expected: expected.min_duration,
            summary: summary.clone(),
            raw: raw.clone(),
        });
    }

    match result.video() {
        None => errors.push(VerifyError::NoVideo {
            summary: summary.clone(),
            raw: raw.clone(),
        }),
        Some(video) if video.codec_name != expected.video_codec => {
            errors.push(VerifyError::InvalidVideoCodec {
                actual: video.codec_name.clone(),
                expected: expected.video_codec.clone(),
                summary,
                raw,
            });
        }
        Some(_) => {}
    }

    errors
}
