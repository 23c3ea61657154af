//! 리컨실리에이션 -- 현재 상태와 목표 상태의 차이를 계산하고 적용
//!
//! [`Reconciler`]는 한 번의 사이클(읽기 -> 차이 계산 -> 적용)을 수행합니다.
//!
//! # 사이클 흐름
//! ```text
//! MembershipReader.snapshot()
//!         |
//!   ReconciliationPlan::compute(valid, connected)
//!         |
//!   join (valid - connected)  ->  leave (connected - valid)
//! ```
//!
//! 매 사이클 전체 상태를 새로 계산하므로, 이벤트를 놓치거나 이전 사이클이 실패해도
//! 다음 사이클에서 목표 상태로 수렴합니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use proxysync_core::metrics as m;

use crate::docker::DockerClient;
use crate::error::SyncError;
use crate::membership::{MembershipReader, MembershipSnapshot};

/// 한 사이클에서 수행할 join/leave 목록
///
/// 정렬된 집합을 사용하므로 적용 순서는 네트워크 ID 순으로 결정적입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// 참여할 네트워크 (valid - connected)
    pub to_join: BTreeSet<String>,
    /// 떠날 네트워크 (connected - valid)
    pub to_leave: BTreeSet<String>,
}

impl ReconciliationPlan {
    /// 목표 집합과 현재 집합의 차이로 계획을 계산합니다.
    pub fn compute(valid: &BTreeSet<String>, connected: &BTreeSet<String>) -> Self {
        Self {
            to_join: valid.difference(connected).cloned().collect(),
            to_leave: connected.difference(valid).cloned().collect(),
        }
    }

    /// 스냅샷으로부터 계획을 계산합니다.
    pub fn from_snapshot(snapshot: &MembershipSnapshot) -> Self {
        Self::compute(&snapshot.valid, &snapshot.connected)
    }

    /// 수행할 액션이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.to_join.is_empty() && self.to_leave.is_empty()
    }

    /// 전체 액션 수
    pub fn len(&self) -> usize {
        self.to_join.len() + self.to_leave.len()
    }
}

/// 리컨실러
pub struct Reconciler<D: DockerClient> {
    docker: Arc<D>,
    reader: MembershipReader<D>,
}

impl<D: DockerClient> Reconciler<D> {
    /// 새 리컨실러를 생성합니다.
    pub fn new(docker: Arc<D>, proxy_id: impl Into<String>) -> Self {
        let reader = MembershipReader::new(Arc::clone(&docker), proxy_id);
        Self { docker, reader }
    }

    /// 프록시 컨테이너 ID
    pub fn proxy_id(&self) -> &str {
        self.reader.proxy_id()
    }

    /// 현재 상태만 읽어 계획을 계산합니다 (적용하지 않음).
    pub async fn plan(&self) -> Result<ReconciliationPlan, SyncError> {
        let snapshot = self.reader.snapshot().await?;
        Ok(ReconciliationPlan::from_snapshot(&snapshot))
    }

    /// 한 사이클을 수행하고 적용한 계획을 반환합니다.
    ///
    /// join을 모두 수행한 뒤 leave를 수행합니다. 어느 호출이든 실패하면
    /// 남은 액션을 버리고 즉시 에러를 반환합니다.
    pub async fn reconcile(&self) -> Result<ReconciliationPlan, SyncError> {
        let snapshot = self.reader.snapshot().await?;
        let plan = ReconciliationPlan::from_snapshot(&snapshot);

        if plan.is_empty() {
            debug!(
                connected = snapshot.connected.len(),
                "proxy membership already converged"
            );
            metrics::gauge!(m::CONNECTED_NETWORKS).set(snapshot.valid.len() as f64);
            return Ok(plan);
        }

        info!(
            join = plan.to_join.len(),
            leave = plan.to_leave.len(),
            "applying reconciliation plan"
        );

        for network_id in &plan.to_join {
            info!(network_id = %network_id, "joining network");
            self.docker
                .connect_network(network_id, self.proxy_id())
                .await
                .inspect_err(|e| warn!(network_id = %network_id, error = %e, "join failed"))?;
            metrics::counter!(m::NETWORK_JOINS_TOTAL).increment(1);
        }

        for network_id in &plan.to_leave {
            info!(network_id = %network_id, "leaving network");
            self.docker
                .disconnect_network(network_id, self.proxy_id())
                .await
                .inspect_err(|e| warn!(network_id = %network_id, error = %e, "leave failed"))?;
            metrics::counter!(m::NETWORK_LEAVES_TOTAL).increment(1);
        }

        metrics::gauge!(m::CONNECTED_NETWORKS).set(snapshot.valid.len() as f64);
        Ok(plan)
    }
}
