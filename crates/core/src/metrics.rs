//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `proxysync_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 이벤트 액션 레이블 키 (create, destroy, connect, disconnect)
pub const LABEL_ACTION: &str = "action";

// ─── 동기화 메트릭 ─────────────────────────────────────────────────

/// 완료된 동기화 사이클 수 (counter, label: result)
pub const RECONCILE_CYCLES_TOTAL: &str = "proxysync_reconcile_cycles_total";

/// 프록시가 참여한 네트워크 수 (counter)
pub const NETWORK_JOINS_TOTAL: &str = "proxysync_network_joins_total";

/// 프록시가 떠난 네트워크 수 (counter)
pub const NETWORK_LEAVES_TOTAL: &str = "proxysync_network_leaves_total";

/// 수신한 네트워크 이벤트 수 (counter, label: action)
pub const EVENTS_RECEIVED_TOTAL: &str = "proxysync_events_received_total";

/// 현재 연속 실패 횟수 (gauge)
pub const CONSECUTIVE_FAILURES: &str = "proxysync_consecutive_failures";

/// 마지막 성공 사이클 이후 프록시가 연결된 네트워크 수 (gauge)
pub const CONNECTED_NETWORKS: &str = "proxysync_connected_networks";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        RECONCILE_CYCLES_TOTAL,
        "Total reconciliation cycles, labelled by result"
    );
    describe_counter!(
        NETWORK_JOINS_TOTAL,
        "Total networks the proxy container was connected to"
    );
    describe_counter!(
        NETWORK_LEAVES_TOTAL,
        "Total networks the proxy container was disconnected from"
    );
    describe_counter!(
        EVENTS_RECEIVED_TOTAL,
        "Total network events received from the runtime"
    );
    describe_gauge!(
        CONSECUTIVE_FAILURES,
        "Current number of consecutive failed reconciliation cycles"
    );
    describe_gauge!(
        CONNECTED_NETWORKS,
        "Networks the proxy container is attached to after the last successful cycle"
    );
}
