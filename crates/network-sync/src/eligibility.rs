//! 네트워크 적격성 판정 -- 프록시가 참여해야 하는 네트워크인지 결정
//!
//! 판정 규칙:
//! - `bridge` 드라이버가 아니면 항상 부적격 (overlay, host, none, macvlan ...)
//! - bridge 네트워크는 다음 중 하나라도 만족하면 적격
//!   1. 드라이버 옵션에 호스트 기본 브리지로 표시됨
//!   2. 멤버 컨테이너가 2개 이상
//!   3. 멤버가 정확히 1개이고 그것이 프록시가 아님
//!
//! 멤버 구성에 따라 결과가 바뀌므로 매 사이클마다 최신 상세 조회 결과로 평가해야 합니다.

use proxysync_core::types::NetworkInfo;

/// 프록시 컨테이너가 `network`에 참여해야 하는지 판정합니다.
///
/// 부수 효과가 없는 순수 함수이며 모든 입력 조합에 대해 정의됩니다.
pub fn is_eligible(network: &NetworkInfo, proxy_id: &str) -> bool {
    if !network.is_bridge() {
        return false;
    }

    if network.is_default_bridge() {
        return true;
    }

    match network.member_count() {
        0 => false,
        1 => !network.has_member(proxy_id),
        _ => true,
    }
}
