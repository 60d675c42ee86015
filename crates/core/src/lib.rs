//! 스트리밍 서버 블랙박스 하네스의 코어
//!
//! 워커와 시나리오 러너가 공유하는 오케스트레이션 구성 요소를 제공합니다.
//!
//! # 모듈 구성
//!
//! - [`context`]: 데드라인과 취소 원인을 갖는 취소 스코프
//! - [`ready`]: 1회성 준비 완료 게이트
//! - [`worker`]: 워커 생명주기 trait과 팩토리
//! - [`probe`]: 프로버의 구조화된 결과
//! - [`verify`]: 기대값과 결과 검증기
//! - [`aggregate`]: 에러를 판정으로 집계
//! - [`protocol`]: 전송 프로토콜 카탈로그
//! - [`config`]: `blackbox.toml`

pub mod aggregate;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod protocol;
pub mod ready;
pub mod verify;
pub mod worker;

// --- 주요 타입 re-export ---

// 에러
pub use error::{BlackboxError, ConfigError, ContextError, ProbeError, VerifyError, WorkerError};

// 설정
pub use config::BlackboxConfig;

// 오케스트레이션 기본 요소
pub use context::{CancelHandle, CancelOrigin, Context};
pub use ready::ReadyGate;
pub use worker::{
    BoxFuture, DynWorker, MediaServer, ProberSettings, PublisherSettings, ServerSettings,
    StreamProber, Worker, WorkerFactory,
};

// 결과
pub use aggregate::{Evidence, Failure, Observation, ScenarioFailure, Verdict, WorkerSlot};
pub use probe::{MediaType, ProbeOutput, ProbeResult, ProbeStream};
pub use protocol::DeliveryProtocol;
pub use verify::{DurationRatio, Expectation};
