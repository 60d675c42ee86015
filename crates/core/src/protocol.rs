//! 전송 프로토콜 — RTMP로 퍼블리시한 스트림을 재생하는 방식
//!
//! 각 프로토콜은 데이터로 표현됩니다. 재생 URL 템플릿, 서버 활성화 토글,
//! 프로버 캡처 길이 배수.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 모든 스트림은 RTMP로 `live` 앱에 퍼블리시
pub fn publish_url(host: &str, rtmp_port: u16, stream_id: &str) -> String {
    format!("rtmp://{host}:{rtmp_port}/live/{stream_id}")
}

/// 프로버가 스트림을 가져올 때 쓰는 프로토콜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryProtocol {
    Rtmp,
    HttpFlv,
    HttpTs,
    Hls,
}

impl DeliveryProtocol {
    pub const ALL: [DeliveryProtocol; 4] = [Self::Rtmp, Self::HttpFlv, Self::HttpTs, Self::Hls];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rtmp => "rtmp",
            Self::HttpFlv => "http-flv",
            Self::HttpTs => "http-ts",
            Self::Hls => "hls",
        }
    }

    /// 프로버가 읽을 URL
    pub fn play_url(&self, host: &str, rtmp_port: u16, http_port: u16, stream_id: &str) -> String {
        match self {
            Self::Rtmp => publish_url(host, rtmp_port, stream_id),
            Self::HttpFlv => format!("http://{host}:{http_port}/live/{stream_id}.flv"),
            Self::HttpTs => format!("http://{host}:{http_port}/live/{stream_id}.ts"),
            Self::Hls => format!("http://{host}:{http_port}/live/{stream_id}.m3u8"),
        }
    }

    /// 이 프로토콜을 활성화하는 서버 환경변수 토글
    pub fn server_envs(&self) -> Vec<String> {
        let envs: &[&str] = match self {
            Self::Rtmp => &[],
            Self::HttpFlv => &[
                "SRS_HTTP_SERVER_ENABLED=on",
                "SRS_VHOST_HTTP_REMUX_ENABLED=on",
                // 추측 모드는 트랜스코더 워밍업 중 오디오를 누락할 수 있음
                "SRS_VHOST_HTTP_REMUX_GUESS_HAS_AV=off",
            ],
            Self::HttpTs => &[
                "SRS_HTTP_SERVER_ENABLED=on",
                "SRS_VHOST_HTTP_REMUX_ENABLED=on",
                "SRS_VHOST_HTTP_REMUX_MOUNT=[vhost]/[app]/[stream].ts",
            ],
            Self::Hls => &["SRS_HTTP_SERVER_ENABLED=on", "SRS_VHOST_HLS_ENABLED=on"],
        };
        envs.iter().map(|e| (*e).to_owned()).collect()
    }

    /// 세그먼트 전송은 완성된 세그먼트만 노출하므로 캡처를 길게 하고
    /// 길이 검사를 완화합니다.
    pub fn is_segmented(&self) -> bool {
        matches!(self, Self::Hls)
    }

    /// 명목 캡처 길이와 타임아웃에 곱하는 배수
    pub fn capture_multiplier(&self) -> u32 {
        if self.is_segmented() { 2 } else { 1 }
    }
}

impl fmt::Display for DeliveryProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!("unknown delivery protocol '{s}', expected one of: rtmp, http-flv, http-ts, hls")
            })
    }
}
