//! 1회성 준비 완료 게이트
//!
//! [`ReadyGate`]는 소유 워커가 한 번만 엽니다 (서버는 접속을 받기 시작할 때,
//! 프로버는 결과를 저장했을 때). 나머지는 관찰만 합니다.
//! 스코프와 같은 취소 토큰으로 표현하므로 의존 워커는
//! [`ReadyGate::wait`]로 "준비 완료 또는 스코프 종료"를 한 번에 기다립니다.

use std::sync::{Arc, OnceLock};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::ContextError;

#[derive(Debug, Default)]
struct GateInner {
    token: CancellationToken,
    fired_at: OnceLock<Instant>,
}

/// 정확히 한 번 열리는 신호
#[derive(Debug, Clone, Default)]
pub struct ReadyGate {
    inner: Arc<GateInner>,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 게이트 열기. 실제로 연 호출만 `true` 반환
    pub fn fire(&self) -> bool {
        // 대기자를 깨우기 전에 fired_at 기록
        if self.inner.fired_at.set(Instant::now()).is_err() {
            return false;
        }
        self.inner.token.cancel();
        true
    }

    pub fn is_ready(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// 게이트가 열린 시각
    pub fn fired_at(&self) -> Option<Instant> {
        self.inner.fired_at.get().copied()
    }

    /// 게이트가 열리면 완료. 소유자가 먼저 실패하면 영원히 대기하므로
    /// 스코프로 제한하려면 [`wait`](Self::wait)를 사용합니다.
    pub async fn ready(&self) {
        self.inner.token.cancelled().await;
    }

    /// 준비 완료 대기. `ctx`가 종료되면 즉시 포기
    ///
    /// 스코프가 이미 종료됐다면 게이트가 열려 있어도 스코프 에러를 반환합니다.
    /// 끝난 시나리오에서 작업이 시작되지 않습니다.
    pub async fn wait(&self, ctx: &Context) -> Result<(), ContextError> {
        tokio::select! {
            biased;
            _ = ctx.done() => Err(ctx.termination()),
            _ = self.ready() => Ok(()),
        }
    }
}
