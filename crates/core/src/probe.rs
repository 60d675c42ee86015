//! 프로브 결과 — 프로버가 전송된 스트림에서 읽어 온 정보

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// 감지된 스트림의 미디어 유형
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Audio,
    Video,
    /// ffprobe가 보고하는 그 밖의 유형 (data, subtitle 등)
    Other(String),
}

impl MediaType {
    fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "audio" => Self::Audio,
            "video" => Self::Video,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Other(kind) => write!(f, "{kind}"),
        }
    }
}

/// 감지된 스트림 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeStream {
    pub index: usize,
    pub codec_name: String,
    pub media_type: MediaType,
}

/// 구조화된 프로브 결과. 생성 후 불변
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// ffprobe가 나열한 순서의 스트림 목록
    pub streams: Vec<ProbeStream>,
    /// 컨테이너 전체 길이
    pub duration: Duration,
}

// ffprobe -print_format json -show_format -show_streams
#[derive(Deserialize)]
struct FfprobeDocument {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    codec_name: String,
    #[serde(default)]
    codec_type: String,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}

impl ProbeResult {
    /// ffprobe가 출력한 JSON 문서 파싱
    ///
    /// `format.duration`은 초 단위 소수를 문자열로 담습니다.
    /// 없으면 길이는 0입니다.
    pub fn from_ffprobe_json(raw: &str) -> Result<Self, ProbeError> {
        let doc: FfprobeDocument =
            serde_json::from_str(raw).map_err(|e| ProbeError::InvalidOutput {
                reason: e.to_string(),
            })?;

        let duration = match doc.format.and_then(|f| f.duration) {
            Some(secs) => parse_seconds(&secs)?,
            None => Duration::ZERO,
        };

        let streams = doc
            .streams
            .into_iter()
            .map(|s| ProbeStream {
                index: s.index,
                codec_name: s.codec_name,
                media_type: MediaType::from_codec_type(&s.codec_type),
            })
            .collect();

        Ok(Self { streams, duration })
    }

    /// 첫 번째 비디오 스트림
    pub fn video(&self) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.media_type == MediaType::Video)
    }

    /// 첫 번째 오디오 스트림
    pub fn audio(&self) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.media_type == MediaType::Audio)
    }
}

fn parse_seconds(secs: &str) -> Result<Duration, ProbeError> {
    let value: f64 = secs.trim().parse().map_err(|_| ProbeError::InvalidOutput {
        reason: format!("duration '{secs}' is not a number"),
    })?;
    Duration::try_from_secs_f64(value).map_err(|e| ProbeError::InvalidOutput {
        reason: format!("duration '{secs}': {e}"),
    })
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duration={:?}, streams={} [",
            self.duration,
            self.streams.len()
        )?;
        for (i, s) in self.streams.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "#{} {}/{}", s.index, s.media_type, s.codec_name)?;
        }
        write!(f, "]")
    }
}

/// 프로브 결과와 파싱 전 원본 텍스트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    pub raw: String,
    pub result: ProbeResult,
}

impl ProbeOutput {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ProbeError> {
        let raw = raw.into();
        let result = ProbeResult::from_ffprobe_json(&raw)?;
        Ok(Self { raw, result })
    }
}
