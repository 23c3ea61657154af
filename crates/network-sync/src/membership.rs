//! 멤버십 조회 -- Docker에서 현재 상태를 읽어 네트워크 ID 집합으로 반환
//!
//! [`MembershipReader`]는 매 사이클마다 권위 있는 런타임 상태를 새로 조회합니다.
//! 결과를 캐시하지 않으며, 하나라도 실패하면 부분 결과 없이 전체 조회가 실패합니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::docker::DockerClient;
use crate::eligibility::is_eligible;
use crate::error::SyncError;

/// 한 사이클에서 조회한 멤버십 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSnapshot {
    /// 적격 네트워크 ID
    pub valid: BTreeSet<String>,
    /// 프록시가 현재 연결된 네트워크 ID
    pub connected: BTreeSet<String>,
}

/// 멤버십 조회기
pub struct MembershipReader<D: DockerClient> {
    /// Docker 클라이언트
    docker: Arc<D>,
    /// 프록시 컨테이너 ID
    proxy_id: String,
}

impl<D: DockerClient> MembershipReader<D> {
    /// 새 조회기를 생성합니다.
    pub fn new(docker: Arc<D>, proxy_id: impl Into<String>) -> Self {
        Self {
            docker,
            proxy_id: proxy_id.into(),
        }
    }

    /// 프록시 컨테이너 ID
    pub fn proxy_id(&self) -> &str {
        &self.proxy_id
    }

    /// 프록시가 참여해야 하는 네트워크 ID 집합을 반환합니다.
    ///
    /// 목록 조회 결과에는 멤버가 빠져 있을 수 있으므로 네트워크마다 상세 조회를 다시 수행합니다.
    /// 목록 조회와 상세 조회 사이에 네트워크가 삭제되어도 이번 사이클은 실패로 처리합니다.
    pub async fn valid_networks(&self) -> Result<BTreeSet<String>, SyncError> {
        let summaries = self.docker.list_networks().await?;
        let mut valid = BTreeSet::new();

        for summary in &summaries {
            let network = self.docker.inspect_network(&summary.id).await?;
            let eligible = is_eligible(&network, &self.proxy_id);
            debug!(
                network_id = %network.id,
                network_name = %network.name,
                driver = %network.driver,
                members = network.member_count(),
                eligible,
                "classified network"
            );
            if eligible {
                valid.insert(network.id);
            }
        }

        info!(
            total = summaries.len(),
            valid = valid.len(),
            "computed valid networks"
        );
        Ok(valid)
    }

    /// 프록시가 현재 연결된 네트워크 ID 집합을 반환합니다.
    pub async fn connected_networks(&self) -> Result<BTreeSet<String>, SyncError> {
        let connected = self.docker.container_networks(&self.proxy_id).await?;
        debug!(
            proxy_id = %self.proxy_id,
            connected = connected.len(),
            "read proxy network settings"
        );
        Ok(connected)
    }

    /// 두 집합을 모두 조회합니다. 하나라도 실패하면 에러를 반환합니다.
    pub async fn snapshot(&self) -> Result<MembershipSnapshot, SyncError> {
        let valid = self.valid_networks().await?;
        let connected = self.connected_networks().await?;
        Ok(MembershipSnapshot { valid, connected })
    }
}

/// 이름으로 프록시 컨테이너를 찾아 ID를 반환합니다.
///
/// 정확히 하나가 아니면 `SyncError::ProxyLookup`을 반환합니다. 재시도로 해결되지 않는
/// 설정 문제이므로 호출자는 프로세스를 종료해야 합니다.
pub async fn resolve_proxy_container<D: DockerClient>(
    docker: &D,
    name: &str,
) -> Result<String, SyncError> {
    let mut ids = docker.find_containers_by_name(name).await?;
    if ids.len() != 1 {
        return Err(SyncError::ProxyLookup {
            name: name.to_owned(),
            found: ids.len(),
        });
    }
    let id = ids.remove(0);
    info!(proxy_name = name, proxy_id = %id, "resolved proxy container");
    Ok(id)
}
