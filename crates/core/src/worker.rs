//! 워커 trait — 시나리오 참여자가 구현하는 생명주기
//!
//! 워커는 [`Context`]가 종료될 때까지 실행되며, 종료되면 정리 후 즉시
//! 반환합니다. 스스로 멈출 때는 형제 워커가 남지 않도록 [`CancelHandle`]을
//! 호출해야 합니다.
//!
//! `Ok(())`는 "종료됨, 원인은 컨텍스트나 다른 워커의 에러로 확인 가능"을,
//! `Err`는 워커가 스스로 실패를 감지했음을 뜻합니다.
//!
//! # 생명주기
//! ```text
//! build (WorkerFactory) → [wait on server ReadyGate] → run(ctx, cancel) → slot
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use crate::context::{CancelHandle, Context};
use crate::error::WorkerError;
use crate::probe::ProbeOutput;
use crate::ready::ReadyGate;

/// [`DynWorker`]가 반환하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 시나리오에 참여하는 장기 실행 워커
///
/// # 사용 예시
/// ```ignore
/// struct Sleeper;
///
/// impl Worker for Sleeper {
///     fn name(&self) -> &str { "sleeper" }
///
///     async fn run(&self, ctx: Context, _cancel: CancelHandle) -> Result<(), WorkerError> {
///         ctx.done().await;
///         Ok(())
///     }
/// }
/// ```
pub trait Worker: Send + Sync {
    /// 로그와 에러 슬롯에 쓰이는 워커 이름
    fn name(&self) -> &str;

    /// `ctx` 종료 또는 워커 자체 종료까지 실행
    fn run(
        &self,
        ctx: Context,
        cancel: CancelHandle,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;
}

/// [`Worker`]의 dyn 호환 버전
///
/// `Worker`는 RPITIT를 사용하므로 trait object가 될 수 없습니다.
/// blanket impl로 모든 `Worker`가 자동으로 구현하며, 오케스트레이터는
/// 서로 다른 워커를 하나의 spawn 경로로 실행합니다.
pub trait DynWorker: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, ctx: Context, cancel: CancelHandle) -> BoxFuture<'_, Result<(), WorkerError>>;
}

impl<T: Worker> DynWorker for T {
    fn name(&self) -> &str {
        Worker::name(self)
    }

    fn run(&self, ctx: Context, cancel: CancelHandle) -> BoxFuture<'_, Result<(), WorkerError>> {
        Box::pin(Worker::run(self, ctx, cancel))
    }
}

/// 테스트 대상 미디어 서버
pub trait MediaServer: Worker {
    /// 서버가 접속을 받기 시작하면 열리는 게이트
    fn ready(&self) -> &ReadyGate;

    fn rtmp_port(&self) -> u16;

    fn http_port(&self) -> u16;

    /// 서버 실행 디렉터리. 캡처 파일은 `objs/` 아래에 저장
    fn work_dir(&self) -> &Path;
}

/// 전송된 스트림을 다시 읽어 오는 프로세스
pub trait StreamProber: Worker {
    /// [`result`](Self::result)가 준비되면 열리는 게이트
    fn probe_done(&self) -> &ReadyGate;

    /// 프로빙 완료 후의 원본 및 구조화 결과
    fn result(&self) -> Option<ProbeOutput>;
}

/// 서버 설정: `KEY=value` 환경변수 토글
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSettings {
    pub envs: Vec<String>,
}

/// 퍼블리셔 설정: 전체 인자 목록
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherSettings {
    pub args: Vec<String>,
    /// 퍼블리시할 스트림 ID (로그 파일 이름에 사용)
    pub stream_id: String,
}

/// 프로버 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProberSettings {
    /// 스트림을 가져올 URL
    pub stream_url: String,
    /// 프로빙 전에 기록할 캡처 파일
    pub dvr_file: PathBuf,
    /// 캡처할 스트림 길이
    pub duration: Duration,
    /// 캡처 전체의 상한. `duration`보다 커야 함
    pub timeout: Duration,
}

/// 시나리오의 세 워커를 생성하는 팩토리
///
/// 서버를 먼저 만들고, 퍼블리셔와 프로버 설정은 서버의 포트와 작업
/// 디렉터리에서 도출합니다.
pub trait WorkerFactory: Send + Sync {
    type Server: MediaServer + 'static;
    type Publisher: Worker + 'static;
    type Prober: StreamProber + 'static;

    fn server(&self, settings: ServerSettings) -> Result<Self::Server, WorkerError>;

    fn publisher(&self, settings: PublisherSettings) -> Result<Self::Publisher, WorkerError>;

    fn prober(&self, settings: ProberSettings) -> Result<Self::Prober, WorkerError>;
}
