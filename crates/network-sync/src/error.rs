//! 네트워크 동기화 에러 타입
//!
//! [`SyncError`]는 동기화 사이클 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<SyncError> for ProxySyncError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use proxysync_core::error::{ConfigError, ProxySyncError, RuntimeError};

/// 네트워크 동기화 도메인 에러
///
/// 연결, 상태 조회, 멤버십 변경, 이벤트 스트림, 설정 에러를 포괄합니다.
/// 사이클 내 에러는 모두 fail-fast로 전파되며 이벤트 루프에서 연속 실패로 집계됩니다.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Docker API 호출 실패 (상태 조회)
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 네트워크를 찾을 수 없음 (목록 조회와 상세 조회 사이에 삭제됨)
    #[error("network not found: {0}")]
    NetworkNotFound(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 이름으로 프록시 컨테이너를 정확히 하나 찾지 못함
    #[error("expected exactly one container named '{name}', found {found}")]
    ProxyLookup {
        /// 조회한 컨테이너 이름
        name: String,
        /// 일치한 컨테이너 수
        found: usize,
    },

    /// 네트워크 참여 실패
    #[error("failed to join network '{network_id}': {reason}")]
    JoinFailed {
        /// 대상 네트워크 ID
        network_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 네트워크 이탈 실패
    #[error("failed to leave network '{network_id}': {reason}")]
    LeaveFailed {
        /// 대상 네트워크 ID
        network_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 이벤트 스트림 에러 또는 스트림 종료
    #[error("event stream error: {0}")]
    EventStream(String),

    /// 연속 실패 한도 초과
    #[error("giving up after {failures} consecutive failures, last error: {last_error}")]
    FailureBudgetExceeded {
        /// 연속 실패 횟수
        failures: u32,
        /// 마지막 실패 원인
        last_error: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<SyncError> for ProxySyncError {
    fn from(err: SyncError) -> Self {
        match &err {
            SyncError::DockerConnection(msg) => {
                ProxySyncError::Runtime(RuntimeError::Connection(msg.clone()))
            }
            SyncError::DockerApi(_)
            | SyncError::NetworkNotFound(_)
            | SyncError::ContainerNotFound(_)
            | SyncError::EventStream(_) => {
                ProxySyncError::Runtime(RuntimeError::StateRead(err.to_string()))
            }
            SyncError::JoinFailed { .. } | SyncError::LeaveFailed { .. } => {
                ProxySyncError::Runtime(RuntimeError::Mutation(err.to_string()))
            }
            SyncError::ProxyLookup { .. } => {
                ProxySyncError::Runtime(RuntimeError::Misconfigured(err.to_string()))
            }
            SyncError::FailureBudgetExceeded { .. } => {
                ProxySyncError::Runtime(RuntimeError::BudgetExhausted(err.to_string()))
            }
            SyncError::Config { field, reason } => {
                ProxySyncError::Config(ConfigError::InvalidValue {
                    field: field.clone(),
                    reason: reason.clone(),
                })
            }
        }
    }
}
