//! # proxysync-network-sync
//!
//! 프록시 컨테이너를 적격 Docker 네트워크에 연결하고, 부적격 네트워크에서 분리합니다.
//!
//! # 아키텍처
//!
//! ```text
//! Docker events ──> ProxySyncer ──> Reconciler ──> MembershipReader ──> DockerClient
//!                       |               |                 |
//!                 FailureBudget   ReconciliationPlan  is_eligible()
//! ```
//!
//! # 주요 컴포넌트
//!
//! - [`ProxySyncer`]: 이벤트 루프와 연속 실패 관리
//! - [`Reconciler`]: join/leave 계획 계산 및 적용
//! - [`MembershipReader`]: 적격 네트워크와 현재 연결 상태 조회
//! - [`is_eligible`]: 네트워크 적격성 판정 (순수 함수)
//! - [`DockerClient`]: Docker API 추상화 (bollard 구현 포함)

pub mod config;
pub mod docker;
pub mod eligibility;
pub mod error;
pub mod event;
pub mod membership;
pub mod reconciler;
pub mod syncer;

// 설정
pub use config::{NetworkSyncConfig, NetworkSyncConfigBuilder};

// Docker
pub use docker::{BollardDockerClient, DockerClient, NetworkEventStream};

// 판정 / 조회
pub use eligibility::is_eligible;
pub use membership::{MembershipReader, MembershipSnapshot, resolve_proxy_container};

// 에러
pub use error::SyncError;

// 이벤트
pub use event::TriggerSet;

// 리컨실리에이션
pub use reconciler::{ReconciliationPlan, Reconciler};

// 루프
pub use syncer::{FailureBudget, ProxySyncer, ProxySyncerBuilder};
