//! 취소 스코프 — 데드라인과 취소 원인 추적
//!
//! [`Context`]는 한 시나리오가 공유하는 수명입니다. 부모가 종료되거나,
//! 데드라인이 지나거나, [`CancelHandle`]이 호출되면 종료됩니다.
//! 가장 먼저 발생한 원인만 기록되며 [`Context::err`]로 조회합니다.
//! 에러 집계기는 이 원인으로 의도된 정리와 실패를 구분합니다.
//!
//! ```text
//! background ──with_timeout──▶ scenario ctx ──clone──▶ server / publisher / prober
//!                                   ▲
//!                      CancelHandle (orchestrator, or per-worker)
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

/// [`Context`]를 취소한 주체
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CancelOrigin {
    /// 스코프 소유자 (시나리오 오케스트레이터)
    Orchestrator,
    /// 스스로 멈춘 뒤 형제 워커를 정리하는 워커 (이름 포함)
    Worker(String),
    /// 상위 스코프
    Parent,
}

impl fmt::Display for CancelOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orchestrator => write!(f, "orchestrator"),
            Self::Worker(name) => write!(f, "worker '{name}'"),
            Self::Parent => write!(f, "parent scope"),
        }
    }
}

struct Scope {
    token: CancellationToken,
    cause: OnceLock<ContextError>,
    deadline: Option<Instant>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    fn cancel_with(&self, cause: ContextError) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let first = self.cause.set(cause).is_ok();
        self.token.cancel();
        first
    }

    fn err(&self) -> Option<ContextError> {
        if !self.token.is_cancelled() {
            return None;
        }
        if let Some(cause) = self.cause.get() {
            return Some(cause.clone());
        }
        // 부모의 데드라인은 곧 이 스코프의 데드라인
        // 그 외 부모 쪽 원인은 모두 Parent로 귀속
        match self.parent.as_ref().and_then(|p| p.err()) {
            Some(ContextError::DeadlineExceeded) => Some(ContextError::DeadlineExceeded),
            _ => Some(ContextError::cancelled(CancelOrigin::Parent)),
        }
    }
}

/// 취소 스코프의 읽기 전용 뷰 (clone 가능)
#[derive(Clone)]
pub struct Context {
    scope: Arc<Scope>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("done", &self.is_done())
            .field("deadline", &self.scope.deadline)
            .field("err", &self.err())
            .finish()
    }
}

impl Context {
    /// 종료되지 않는 루트 스코프
    pub fn background() -> Self {
        Self {
            scope: Arc::new(Scope {
                token: CancellationToken::new(),
                cause: OnceLock::new(),
                deadline: None,
                parent: None,
            }),
        }
    }

    /// 반환된 핸들로 취소할 수 있는 하위 스코프 생성
    pub fn with_cancel(parent: &Context) -> (Context, CancelHandle) {
        let scope = Arc::new(Scope {
            token: parent.scope.token.child_token(),
            cause: OnceLock::new(),
            deadline: parent.scope.deadline,
            parent: Some(parent.scope.clone()),
        });
        let handle = CancelHandle {
            scope: scope.clone(),
            origin: CancelOrigin::Orchestrator,
        };
        (Context { scope }, handle)
    }

    /// `timeout` 경과 시에도 종료되는 하위 스코프 생성
    ///
    /// 실제 데드라인은 부모 데드라인과 `now + timeout` 중 빠른 쪽입니다.
    /// 감시 태스크를 spawn하므로 Tokio 런타임 안에서 호출해야 합니다.
    /// 감시 태스크는 취소되면 바로 종료됩니다.
    pub fn with_timeout(parent: &Context, timeout: Duration) -> (Context, CancelHandle) {
        let own = Instant::now() + timeout;
        let deadline = match parent.scope.deadline {
            Some(inherited) if inherited < own => inherited,
            _ => own,
        };

        let scope = Arc::new(Scope {
            token: parent.scope.token.child_token(),
            cause: OnceLock::new(),
            deadline: Some(deadline),
            parent: Some(parent.scope.clone()),
        });

        let watched = scope.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(own) => {
                    if watched.cancel_with(ContextError::DeadlineExceeded) {
                        tracing::debug!("context deadline exceeded");
                    }
                }
                _ = watched.token.cancelled() => {}
            }
        });

        let handle = CancelHandle {
            scope: scope.clone(),
            origin: CancelOrigin::Orchestrator,
        };
        (Context { scope }, handle)
    }

    /// 스코프 만료 시각 (데드라인이 있을 때)
    pub fn deadline(&self) -> Option<Instant> {
        self.scope.deadline
    }

    /// 데드라인까지 남은 시간. 지난 뒤에는 0
    pub fn remaining(&self) -> Option<Duration> {
        self.scope
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// 논블로킹 확인
    pub fn is_done(&self) -> bool {
        self.scope.token.is_cancelled()
    }

    /// 스코프가 종료되면 완료되는 future. cancel-safe
    pub async fn done(&self) {
        self.scope.token.cancelled().await;
    }

    /// 종료 원인. 아직 살아 있으면 `None`
    pub fn err(&self) -> Option<ContextError> {
        self.scope.err()
    }

    /// [`err`](Self::err)와 같지만 `done`을 이미 관찰한 호출자용
    pub(crate) fn termination(&self) -> ContextError {
        self.err()
            .unwrap_or(ContextError::cancelled(CancelOrigin::Parent))
    }
}

/// [`Context`]의 쓰기 측 핸들
///
/// clone들은 같은 스코프를 공유하며, 각자 취소 원인으로 기록될
/// [`CancelOrigin`]을 가집니다. 취소는 멱등이며 최초 취소만 원인을 남깁니다.
#[derive(Clone)]
pub struct CancelHandle {
    scope: Arc<Scope>,
    origin: CancelOrigin,
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("origin", &self.origin)
            .finish()
    }
}

impl CancelHandle {
    /// 스코프 취소. 실제로 종료시킨 호출만 `true` 반환
    pub fn cancel(&self) -> bool {
        self.scope
            .cancel_with(ContextError::cancelled(self.origin.clone()))
    }

    /// 같은 스코프에 대해 `worker`에 귀속되는 취소 핸들
    pub fn for_worker(&self, worker: impl Into<String>) -> CancelHandle {
        CancelHandle {
            scope: self.scope.clone(),
            origin: CancelOrigin::Worker(worker.into()),
        }
    }

    /// 이 핸들로 취소할 때 기록되는 주체
    pub fn origin(&self) -> &CancelOrigin {
        &self.origin
    }
}
