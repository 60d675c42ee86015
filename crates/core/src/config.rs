//! 설정 관리 — blackbox.toml 파싱 및 런타임 설정
//!
//! [`BlackboxConfig`]는 시나리오 오케스트레이터에 명시적으로 전달됩니다.
//! 로딩 이후에는 프로세스 전역 상태를 읽지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`BLACKBOX_PROBER_DURATION_MS=8000` 형식)
//! 3. 설정 파일 (`blackbox.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), blackbox_core::error::BlackboxError> {
//! use blackbox_core::config::BlackboxConfig;
//!
//! let config = BlackboxConfig::load("blackbox.toml").await?;
//! let config = BlackboxConfig::parse("[scenario]\ntimeout_ms = 30000")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BlackboxError, ConfigError};
use crate::verify::DurationRatio;

/// 하네스 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlackboxConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub prober: ProberConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl BlackboxConfig {
    /// TOML 파일 로드 후 환경변수 오버라이드 적용 및 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BlackboxError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 환경변수 오버라이드 없이 TOML 파일 로드
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BlackboxError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlackboxError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                BlackboxError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열 파싱. 누락된 섹션과 필드는 기본값 사용
    pub fn parse(toml_str: &str) -> Result<Self, BlackboxError> {
        toml::from_str(toml_str).map_err(|e| {
            BlackboxError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// `BLACKBOX_{SECTION}_{FIELD}` 환경변수로 값 오버라이드
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "BLACKBOX_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "BLACKBOX_GENERAL_LOG_FORMAT");

        override_path(&mut self.server.binary, "BLACKBOX_SERVER_BINARY");
        override_path(&mut self.server.config_file, "BLACKBOX_SERVER_CONFIG_FILE");
        override_path(&mut self.server.work_dir, "BLACKBOX_SERVER_WORK_DIR");
        override_string(&mut self.server.host, "BLACKBOX_SERVER_HOST");
        override_u64(
            &mut self.server.ready_poll_interval_ms,
            "BLACKBOX_SERVER_READY_POLL_INTERVAL_MS",
        );
        override_csv(&mut self.server.envs, "BLACKBOX_SERVER_ENVS");

        override_path(&mut self.publisher.binary, "BLACKBOX_PUBLISHER_BINARY");
        override_path(&mut self.publisher.input, "BLACKBOX_PUBLISHER_INPUT");

        override_path(&mut self.prober.ffmpeg_binary, "BLACKBOX_PROBER_FFMPEG_BINARY");
        override_path(
            &mut self.prober.ffprobe_binary,
            "BLACKBOX_PROBER_FFPROBE_BINARY",
        );
        override_u64(&mut self.prober.duration_ms, "BLACKBOX_PROBER_DURATION_MS");
        override_u64(&mut self.prober.timeout_ms, "BLACKBOX_PROBER_TIMEOUT_MS");

        override_u64(&mut self.scenario.timeout_ms, "BLACKBOX_SCENARIO_TIMEOUT_MS");
        override_string(
            &mut self.scenario.video_codec,
            "BLACKBOX_SCENARIO_VIDEO_CODEC",
        );
        override_u32(
            &mut self.scenario.segmented_min_duration.numerator,
            "BLACKBOX_SCENARIO_SEGMENTED_MIN_DURATION_NUMERATOR",
        );
        override_u32(
            &mut self.scenario.segmented_min_duration.denominator,
            "BLACKBOX_SCENARIO_SEGMENTED_MIN_DURATION_DENOMINATOR",
        );

        override_bool(&mut self.metrics.enabled, "BLACKBOX_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "BLACKBOX_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "BLACKBOX_METRICS_PORT");
    }

    /// 설정 값 범위 검증
    pub fn validate(&self) -> Result<(), BlackboxError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        for (field, path) in [
            ("server.binary", &self.server.binary),
            ("publisher.binary", &self.publisher.binary),
            ("publisher.input", &self.publisher.input),
            ("prober.ffmpeg_binary", &self.prober.ffmpeg_binary),
            ("prober.ffprobe_binary", &self.prober.ffprobe_binary),
        ] {
            if path.as_os_str().is_empty() {
                return Err(invalid(field, "must not be empty".to_owned()));
            }
        }

        if self.server.host.is_empty() {
            return Err(invalid("server.host", "must not be empty".to_owned()));
        }

        if self.server.ready_poll_interval_ms == 0 {
            return Err(invalid(
                "server.ready_poll_interval_ms",
                "must be greater than 0".to_owned(),
            ));
        }

        if let Some(bad) = self.server.envs.iter().find(|e| !e.contains('=')) {
            return Err(invalid(
                "server.envs",
                format!("'{bad}' is not a KEY=value pair"),
            ));
        }

        for (field, value) in [
            ("prober.duration_ms", self.prober.duration_ms),
            ("prober.timeout_ms", self.prober.timeout_ms),
            ("scenario.timeout_ms", self.scenario.timeout_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0".to_owned()));
            }
        }

        if self.prober.timeout_ms < self.prober.duration_ms {
            return Err(invalid(
                "prober.timeout_ms",
                "must not be shorter than prober.duration_ms".to_owned(),
            ));
        }

        if self.scenario.video_codec.is_empty() {
            return Err(invalid("scenario.video_codec", "must not be empty".to_owned()));
        }

        let ratio = self.scenario.segmented_min_duration;
        if ratio.denominator == 0 || ratio.numerator > ratio.denominator {
            return Err(invalid(
                "scenario.segmented_min_duration",
                format!("{ratio} must be a fraction in [0, 1] with a non-zero denominator"),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must be non-zero when metrics are enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> BlackboxError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 로깅 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json 또는 pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 테스트 대상 미디어 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 서버 실행 파일. 절대 경로가 아니면 `work_dir` 기준
    pub binary: PathBuf,
    /// `-c`로 전달할 설정 파일 (`work_dir` 기준)
    pub config_file: PathBuf,
    /// 서버 실행 디렉터리. 상대 경로는 현재 디렉터리 기준 절대 경로로 변환
    pub work_dir: PathBuf,
    /// 퍼블리시/재생 URL에 쓰는 호스트
    pub host: String,
    /// 준비 상태 접속 시도 간격 (ms)
    pub ready_poll_interval_ms: u64,
    /// 모든 시나리오에 적용할 추가 `KEY=value` 토글
    pub envs: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("./objs/srs"),
            config_file: PathBuf::from("conf/console.conf"),
            work_dir: PathBuf::from("."),
            host: "localhost".to_owned(),
            ready_poll_interval_ms: 100,
            envs: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

/// 스트림 퍼블리셔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// FFmpeg 실행 파일. 경로 구성 요소가 있으면 `work_dir` 기준
    pub binary: PathBuf,
    /// 서버로 반복 송출할 미디어 파일 (`work_dir` 기준)
    pub input: PathBuf,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            input: PathBuf::from("avatar.flv"),
        }
    }
}

/// 스트림 프로버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProberConfig {
    /// 캡처용 FFmpeg 실행 파일
    pub ffmpeg_binary: PathBuf,
    /// 분석용 FFprobe 실행 파일
    pub ffprobe_binary: PathBuf,
    /// 명목 캡처 길이 (ms)
    pub duration_ms: u64,
    /// 캡처 전체의 상한 (ms)
    pub timeout_ms: u64,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: PathBuf::from("ffmpeg"),
            ffprobe_binary: PathBuf::from("ffprobe"),
            duration_ms: 16_000,
            timeout_ms: 21_000,
        }
    }
}

impl ProberConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 시나리오별 제한과 기대값
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// 시나리오 1회의 최대 실행 시간 (ms)
    pub timeout_ms: u64,
    /// 기대하는 비디오 스트림의 ffprobe 코덱 이름
    pub video_codec: String,
    /// 세그먼트 전송이 도달해야 하는 캡처 길이 비율
    pub segmented_min_duration: DurationRatio,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 64_000,
            video_codec: "hevc".to_owned(),
            segmented_min_duration: DurationRatio::ONE_THIRD,
        }
    }
}

impl ScenarioConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Prometheus exporter 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9109,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_path(target: &mut PathBuf, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = PathBuf::from(val);
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
