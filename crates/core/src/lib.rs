//! proxysync 공통 크레이트
//!
//! 모든 proxysync 크레이트가 공유하는 에러, 설정, 도메인 타입, 메트릭 이름을 정의합니다.
//!
//! - [`error`]: 최상위 에러 (`ProxySyncError`)
//! - [`config`]: `proxysync.toml` 로딩 및 검증
//! - [`types`]: 네트워크 스냅샷과 런타임 이벤트
//! - [`metrics`]: Prometheus 메트릭 이름

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ProxySyncError, RuntimeError};

// 설정
pub use config::ProxySyncConfig;

// 도메인 타입
pub use types::{EndpointInfo, NetworkAction, NetworkEvent, NetworkInfo};
