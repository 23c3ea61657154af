//! 에러 타입 — 도메인별 에러 정의

/// proxysync 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ProxySyncError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 컨테이너 런타임 관련 에러
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

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

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 컨테이너 런타임 에러
///
/// 동기화 사이클에서 발생한 에러를 상위 레이어에 전달할 때 사용합니다.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Docker 데몬 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 상태 조회 실패 (네트워크 목록/조회, 컨테이너 조회)
    #[error("state read failed: {0}")]
    StateRead(String),

    /// 멤버십 변경 실패 (join/leave)
    #[error("mutation failed: {0}")]
    Mutation(String),

    /// 프록시 컨테이너 설정 문제 (0개 또는 2개 이상)
    #[error("proxy container misconfigured: {0}")]
    Misconfigured(String),

    /// 연속 실패 한도 초과
    #[error("failure budget exhausted: {0}")]
    BudgetExhausted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: ProxySyncError = ConfigError::InvalidValue {
            field: "sync.trigger".to_owned(),
            reason: "unknown".to_owned(),
        }
        .into();
        assert!(matches!(err, ProxySyncError::Config(_)));
        assert!(err.to_string().contains("sync.trigger"));
    }

    #[test]
    fn runtime_error_converts_to_top_level() {
        let err: ProxySyncError = RuntimeError::Mutation("join net-1".to_owned()).into();
        assert!(matches!(err, ProxySyncError::Runtime(RuntimeError::Mutation(_))));
        assert!(err.to_string().contains("join net-1"));
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ProxySyncError = io.into();
        assert!(matches!(err, ProxySyncError::Io(_)));
    }

    #[test]
    fn file_not_found_display_contains_path() {
        let err = ConfigError::FileNotFound {
            path: "/etc/proxysync/proxysync.toml".to_owned(),
        };
        assert!(err.to_string().contains("proxysync.toml"));
    }
}
