//! 에러 타입 — 실패 영역별 에러 정의, [`BlackboxError`]로 통합

use crate::context::CancelOrigin;

/// 하네스 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum BlackboxError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 작업이 끝나기 전에 시나리오 스코프가 종료됨
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// 워커가 스스로 보고한 실패
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    /// 프로버가 사용할 수 있는 결과를 만들지 못함
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    /// 프로빙한 스트림이 기대값을 만족하지 못함
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// [`BlackboxConfig`](crate::config::BlackboxConfig)로 파싱할 수 없는 TOML
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 허용 범위를 벗어난 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// [`Context`](crate::context::Context)가 종료된 원인
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// 스코프의 데드라인 경과
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// 취소 핸들 보유자가 스코프를 취소함
    #[error("context cancelled by {origin}")]
    Cancelled { origin: CancelOrigin },
}

impl ContextError {
    /// `origin`에 귀속된 취소 에러 생성
    pub fn cancelled(origin: CancelOrigin) -> Self {
        Self::Cancelled { origin }
    }

    /// [`ContextError::DeadlineExceeded`]이면 `true`
    pub fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

/// 워커 `run`이 반환하는 에러
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// 워커 생성 실패
    #[error("failed to set up {worker}: {reason}")]
    Setup { worker: String, reason: String },

    /// 자식 프로세스 실행 실패
    #[error("failed to spawn {worker}: {source}")]
    Spawn {
        worker: String,
        source: std::io::Error,
    },

    /// 계속 실행되어야 할 자식 프로세스가 스스로 종료됨
    #[error("{worker} exited unexpectedly with {status}")]
    Exited { worker: String, status: String },

    /// 워커가 자기 작업에서 실패를 감지함
    #[error("{worker} failed: {reason}")]
    Failed { worker: String, reason: String },

    /// 스코프 종료로 워커가 중단됨
    #[error("{worker} interrupted: {source}")]
    Context {
        worker: String,
        source: ContextError,
    },

    /// 워커 태스크 패닉 또는 중단
    #[error("{worker} task aborted: {reason}")]
    Aborted { worker: String, reason: String },

    /// 워커 감독 중 I/O 실패
    #[error("{worker} io error: {source}")]
    Io {
        worker: String,
        source: std::io::Error,
    },
}

impl WorkerError {
    /// [`WorkerError::Context`]가 담고 있는 컨텍스트 에러
    pub fn context_error(&self) -> Option<&ContextError> {
        match self {
            Self::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// 프로버 출력을 [`ProbeResult`](crate::probe::ProbeResult)로 변환할 때의 에러
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// ffprobe 출력이 기대한 JSON 문서가 아님
    #[error("invalid ffprobe output: {reason}")]
    InvalidOutput { reason: String },

    /// 프로브 완료 게이트는 열렸지만 저장된 결과가 없음
    #[error("probe signalled completion without a result")]
    MissingResult,

    /// 프로버가 완료되기 전에 시나리오가 끝남
    #[error("no probe result before the scenario ended ({observation})")]
    NotCompleted { observation: String },
}

/// 시나리오 기대값과 맞지 않는 프로브 결과
///
/// 모든 variant는 결과의 한 줄 요약과 ffprobe 원본 출력을 함께 담습니다.
/// 재실행 없이 실패 원인을 확인할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid streams={actual}, expected {expected}, {summary}, {raw}")]
    InvalidStreams {
        actual: usize,
        expected: usize,
        summary: String,
        raw: String,
    },

    #[error("short duration={actual:?} < {expected:?}, {summary}, {raw}")]
    ShortDuration {
        actual: std::time::Duration,
        expected: std::time::Duration,
        summary: String,
        raw: String,
    },

    #[error("no video {summary}, {raw}")]
    NoVideo { summary: String, raw: String },

    #[error("invalid video codec={actual}, expected {expected}, {summary}, {raw}")]
    InvalidVideoCodec {
        actual: String,
        expected: String,
        summary: String,
        raw: String,
    },
}
