//! 메트릭 이름 상수
//!
//! 러너는 이 상수로 `metrics` facade에 기록합니다.
//! exporter가 설치되지 않으면 아무것도 기록되지 않습니다.
//!
//! # 명명 규칙
//!
//! - prefix: `blackbox_`
//! - suffix: `_total` (counter), `_seconds` (histogram)

/// 시나리오 이름 라벨 키
pub const LABEL_SCENARIO: &str = "scenario";

/// 전송 프로토콜 라벨 키 (rtmp, http-flv, http-ts, hls)
pub const LABEL_PROTOCOL: &str = "protocol";

/// 판정 라벨 키 (passed, failed, skipped)
pub const LABEL_VERDICT: &str = "verdict";

/// 관찰 결과 라벨 키 (probe_completed, deadline_expired, interrupted)
pub const LABEL_OBSERVATION: &str = "observation";

/// 워커 라벨 키 (server, publisher, prober)
pub const LABEL_WORKER: &str = "worker";

/// 판정별 완료 시나리오 수 (counter)
pub const SCENARIOS_TOTAL: &str = "blackbox_scenarios_total";

/// 시나리오 1회 소요 시간 (histogram, 초)
pub const SCENARIO_DURATION_SECONDS: &str = "blackbox_scenario_duration_seconds";

/// 에러가 기록된 워커 슬롯 수 (counter, label: worker)
pub const WORKER_ERRORS_TOTAL: &str = "blackbox_worker_errors_total";

/// 실패한 검증 항목 수 (counter)
pub const VERIFY_ERRORS_TOTAL: &str = "blackbox_verify_errors_total";

/// exporter 설명 등록용 전체 메트릭 목록
pub const ALL: [(&str, &str); 4] = [
    (SCENARIOS_TOTAL, "Scenarios finished, by verdict"),
    (SCENARIO_DURATION_SECONDS, "Wall-clock duration of a scenario"),
    (WORKER_ERRORS_TOTAL, "Worker slots holding an error"),
    (VERIFY_ERRORS_TOTAL, "Failed verification checks"),
];
