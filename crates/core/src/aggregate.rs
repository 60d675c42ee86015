//! 에러 집계 — 시나리오의 모든 에러 출처를 하나의 판정으로 통합
//!
//! 보고 순서: 시나리오 컨텍스트 에러, 워커별 슬롯 (server, publisher,
//! prober), 프로브 에러, 검증 에러.
//! 오케스트레이터가 의도적으로 일으킨 취소는 버리고 나머지는 모두 모읍니다.

use std::fmt;

use crate::context::CancelOrigin;
use crate::error::{BlackboxError, ContextError, ProbeError, VerifyError, WorkerError};

/// 시나리오 관찰 단계의 종료 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// 프로버가 완료를 알림
    ProbeCompleted,
    /// 시나리오 데드라인이 먼저 경과
    DeadlineExpired,
    /// 프로브 완료 전에 스코프가 취소됨
    Interrupted,
}

impl Observation {
    /// 데드라인과 프로브 사이 경쟁의 결과 분류
    ///
    /// 이미 발생한 데드라인이 우선합니다. 같은 시점에 완료된 프로브는
    /// 검증하지 않습니다.
    pub fn classify(probe_ready: bool, ctx_err: Option<&ContextError>) -> Self {
        match ctx_err {
            Some(ContextError::DeadlineExceeded) => Self::DeadlineExpired,
            _ if probe_ready => Self::ProbeCompleted,
            _ => Self::Interrupted,
        }
    }

    /// 메트릭과 JSON 리포트용 고정 라벨
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProbeCompleted => "probe_completed",
            Self::DeadlineExpired => "deadline_expired",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeCompleted => write!(f, "probe completed"),
            Self::DeadlineExpired => write!(f, "deadline expired"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// 워커 태스크가 종료 시 기록한 에러
#[derive(Debug)]
pub struct WorkerSlot {
    pub name: String,
    pub error: Option<WorkerError>,
}

impl WorkerSlot {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: WorkerError) -> Self {
        Self {
            name: name.into(),
            error: Some(error),
        }
    }
}

/// 실패에 기여한 에러와 그 출처
#[derive(Debug)]
pub struct Failure {
    pub origin: String,
    pub error: BlackboxError,
}

/// 시나리오를 실패시킨 모든 에러
#[derive(Debug, thiserror::Error)]
pub struct ScenarioFailure {
    pub failures: Vec<Failure>,
}

impl fmt::Display for ScenarioFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", failure.origin, failure.error)?;
        }
        Ok(())
    }
}

/// 시나리오 최종 판정
#[derive(Debug)]
pub enum Verdict {
    Passed,
    Failed(ScenarioFailure),
    /// 실행 전제 조건이 없음. 실패로 보지 않음
    Skipped(String),
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// 로그와 메트릭용 고정 라벨
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }
}

/// 집계기가 참고하는 모든 입력
#[derive(Debug)]
pub struct Evidence {
    pub ctx_err: Option<ContextError>,
    pub observation: Observation,
    pub slots: Vec<WorkerSlot>,
    pub probe_error: Option<ProbeError>,
    pub verification: Vec<VerifyError>,
}

/// 컨텍스트 에러가 오케스트레이터 자신의 동작으로 생긴 예상된 결과인지 판단
///
/// 오케스트레이터의 취소는 항상 무해합니다. 프로브 완료 후의 취소는
/// 남은 워커를 정리하는 정상 과정입니다. 데드라인은 절대 무해하지 않습니다.
pub fn is_benign(err: &ContextError, observation: Observation) -> bool {
    match err {
        ContextError::DeadlineExceeded => false,
        ContextError::Cancelled {
            origin: CancelOrigin::Orchestrator,
        } => true,
        ContextError::Cancelled { .. } => observation == Observation::ProbeCompleted,
    }
}

/// 수집된 근거를 판정으로 집계
pub fn aggregate(evidence: Evidence) -> Verdict {
    let Evidence {
        ctx_err,
        observation,
        slots,
        probe_error,
        verification,
    } = evidence;

    let mut failures = Vec::new();

    if let Some(err) = ctx_err {
        if is_benign(&err, observation) {
            tracing::debug!(error = %err, "ignoring expected cancellation");
        } else {
            failures.push(Failure {
                origin: "context".to_owned(),
                error: err.into(),
            });
        }
    }

    for slot in slots {
        let Some(err) = slot.error else { continue };
        let benign = err
            .context_error()
            .is_some_and(|ctx_err| is_benign(ctx_err, observation));
        if benign {
            tracing::debug!(worker = %slot.name, error = %err, "ignoring expected cancellation");
            continue;
        }
        failures.push(Failure {
            origin: slot.name,
            error: err.into(),
        });
    }

    if let Some(err) = probe_error {
        failures.push(Failure {
            origin: "probe".to_owned(),
            error: err.into(),
        });
    }

    for err in verification {
        failures.push(Failure {
            origin: "verify".to_owned(),
            error: err.into(),
        });
    }

    // 프로브 결과가 없는 시나리오는 통과할 수 없음
    if failures.is_empty() && observation != Observation::ProbeCompleted {
        failures.push(Failure {
            origin: "probe".to_owned(),
            error: ProbeError::NotCompleted {
                observation: observation.to_string(),
            }
            .into(),
        });
    }

    if failures.is_empty() {
        Verdict::Passed
    } else {
        Verdict::Failed(ScenarioFailure { failures })
    }
}
