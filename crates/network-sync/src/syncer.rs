//! 동기화 루프 -- 이벤트 수신/리컨실리에이션/연속 실패 관리
//!
//! [`ProxySyncer`]는 시작 시 한 번 무조건 사이클을 수행한 뒤, 네트워크 이벤트를
//! 하나씩 받아 매번 전체 리컨실리에이션을 수행합니다.
//!
//! # 내부 아키텍처
//! ```text
//! startup ──> reconcile()
//!                |
//! NetworkEvent ──stream──> ProxySyncer ──> reconcile() ──> FailureBudget
//!                              |                               |
//!                   stream error / end                  threshold 초과
//!                              |                               |
//!              backoff 후 재구독 + reconcile()      FailureBudgetExceeded 반환
//! ```
//!
//! 스트림 에러나 종료 자체는 실패로 세지 않습니다. 재구독 직후의 사이클 결과만
//! 카운터에 반영되므로, 런타임이 죽어 있으면 그 사이클이 실패로 집계됩니다.
//!
//! 사이클은 겹치지 않습니다. 이전 사이클이 끝날 때까지 다음 이벤트를 읽지 않으며,
//! 그동안 도착한 이벤트는 런타임의 이벤트 스트림에 쌓입니다.

use std::convert::Infallible;
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{Instrument, debug, error, info, info_span, warn};

use proxysync_core::metrics as m;

use crate::config::NetworkSyncConfig;
use crate::docker::DockerClient;
use crate::error::SyncError;
use crate::reconciler::{ReconciliationPlan, Reconciler};

/// 연속 실패 카운터
///
/// 성공하면 0으로 초기화되고 실패하면 1 증가합니다.
/// 카운터가 임계값을 **초과**하면 소진된 것으로 봅니다. 임계값이 10이면
/// 10번째 연속 실패는 허용되고 11번째에서 종료됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureBudget {
    consecutive: u32,
    threshold: u32,
}

impl FailureBudget {
    /// 임계값으로 새 카운터를 생성합니다.
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold,
        }
    }

    /// 현재 연속 실패 횟수
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// 임계값
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// 성공을 기록합니다.
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// 실패를 기록합니다.
    ///
    /// 한도를 넘으면 `cause`를 담은 `SyncError::FailureBudgetExceeded`를 반환합니다.
    pub fn record_failure(&mut self, cause: &SyncError) -> Result<u32, SyncError> {
        self.consecutive = self.consecutive.saturating_add(1);
        if self.is_exhausted() {
            return Err(SyncError::FailureBudgetExceeded {
                failures: self.consecutive,
                last_error: cause.to_string(),
            });
        }
        Ok(self.consecutive)
    }

    /// 한도를 넘었는지 확인합니다.
    pub fn is_exhausted(&self) -> bool {
        self.consecutive > self.threshold
    }
}

/// 프록시 네트워크 동기화 루프
///
/// # 사용 예시
/// ```ignore
/// use proxysync_network_sync::{ProxySyncerBuilder, resolve_proxy_container};
///
/// let proxy_id = resolve_proxy_container(docker.as_ref(), &config.proxy_container).await?;
/// let mut syncer = ProxySyncerBuilder::new()
///     .config(config)
///     .docker_client(docker)
///     .proxy_id(proxy_id)
///     .build()?;
///
/// // 치명적 에러가 발생할 때만 반환
/// let Err(e) = syncer.run().await;
/// ```
pub struct ProxySyncer<D: DockerClient> {
    /// 동기화 설정
    config: NetworkSyncConfig,
    /// Docker 클라이언트 (공유)
    docker: Arc<D>,
    /// 리컨실러
    reconciler: Reconciler<D>,
    /// 연속 실패 카운터
    budget: FailureBudget,
}

impl<D: DockerClient> ProxySyncer<D> {
    /// 프록시 컨테이너 ID
    pub fn proxy_id(&self) -> &str {
        self.reconciler.proxy_id()
    }

    /// 동기화 설정
    pub fn config(&self) -> &NetworkSyncConfig {
        &self.config
    }

    /// 현재 연속 실패 횟수
    pub fn consecutive_failures(&self) -> u32 {
        self.budget.consecutive()
    }

    /// 리컨실리에이션 사이클을 한 번 수행합니다.
    ///
    /// 실패 카운터에는 영향을 주지 않습니다. `--once` 실행과 루프 내부에서 사용합니다.
    pub async fn sync_once(&self) -> Result<ReconciliationPlan, SyncError> {
        self.cycle("manual").await
    }

    /// 동기화 루프를 실행합니다.
    ///
    /// 연속 실패가 한도를 넘을 때만 `SyncError::FailureBudgetExceeded`로 반환합니다.
    /// 그 외의 모든 에러는 로그로 남기고 카운터에 반영한 뒤 계속 진행합니다.
    pub async fn run(&mut self) -> Result<Infallible, SyncError> {
        info!(
            proxy_id = %self.proxy_id(),
            trigger = %self.config.trigger,
            max_consecutive_failures = self.budget.threshold(),
            "starting proxy network sync loop"
        );

        let mut trigger = "startup";

        loop {
            // 구독 후 사이클을 돌려 재연결 공백 동안의 변경도 수렴시킴
            let mut events = self.docker.network_events(self.config.trigger);
            let result = self.cycle(trigger).await;
            self.record(result)?;
            trigger = "resubscribe";

            loop {
                match events.next().await {
                    Some(Ok(event)) => {
                        metrics::counter!(
                            m::EVENTS_RECEIVED_TOTAL,
                            m::LABEL_ACTION => event.action.as_str()
                        )
                        .increment(1);
                        debug!(
                            action = %event.action,
                            network_id = %event.network_id,
                            "network event received"
                        );
                        let result = self.cycle(event.action.as_str()).await;
                        self.record(result)?;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "network event stream failed, resubscribing");
                        break;
                    }
                    None => {
                        warn!("network event stream closed, resubscribing");
                        break;
                    }
                }
            }

            tokio::time::sleep(self.config.resubscribe_backoff()).await;
        }
    }

    /// 사이클 하나를 span 안에서 수행하고 결과 메트릭을 기록합니다.
    async fn cycle(&self, trigger: &'static str) -> Result<ReconciliationPlan, SyncError> {
        let cycle_id = uuid::Uuid::new_v4();
        let span = info_span!("reconcile", cycle_id = %cycle_id, trigger);

        let result = self.reconciler.reconcile().instrument(span).await;
        let label = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!(m::RECONCILE_CYCLES_TOTAL, m::LABEL_RESULT => label).increment(1);
        result
    }

    fn record(&mut self, result: Result<ReconciliationPlan, SyncError>) -> Result<(), SyncError> {
        match result {
            Ok(plan) => {
                if self.budget.consecutive() > 0 {
                    info!(
                        previous_failures = self.budget.consecutive(),
                        "reconciliation recovered"
                    );
                }
                debug!(
                    joined = plan.to_join.len(),
                    left = plan.to_leave.len(),
                    "reconciliation cycle complete"
                );
                self.budget.record_success();
                metrics::gauge!(m::CONSECUTIVE_FAILURES).set(0.0);
                Ok(())
            }
            Err(e) => self.record_failure(&e),
        }
    }

    fn record_failure(&mut self, cause: &SyncError) -> Result<(), SyncError> {
        let outcome = self.budget.record_failure(cause);
        let failures = self.budget.consecutive();
        metrics::gauge!(m::CONSECUTIVE_FAILURES).set(f64::from(failures));

        match outcome {
            Ok(_) => {
                warn!(
                    error = %cause,
                    consecutive_failures = failures,
                    threshold = self.budget.threshold(),
                    "reconciliation cycle failed"
                );
                Ok(())
            }
            Err(fatal) => {
                error!(error = %cause, consecutive_failures = failures, "failure budget exhausted");
                Err(fatal)
            }
        }
    }
}

/// 동기화 루프 빌더
pub struct ProxySyncerBuilder<D: DockerClient> {
    config: NetworkSyncConfig,
    docker: Option<Arc<D>>,
    proxy_id: Option<String>,
}

impl<D: DockerClient> ProxySyncerBuilder<D> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: NetworkSyncConfig::default(),
            docker: None,
            proxy_id: None,
        }
    }

    /// 동기화 설정을 지정합니다.
    pub fn config(mut self, config: NetworkSyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Docker 클라이언트를 설정합니다.
    pub fn docker_client(mut self, docker: Arc<D>) -> Self {
        self.docker = Some(docker);
        self
    }

    /// 프록시 컨테이너 ID를 설정합니다.
    ///
    /// 보통 [`resolve_proxy_container`](crate::membership::resolve_proxy_container)의 결과입니다.
    pub fn proxy_id(mut self, proxy_id: impl Into<String>) -> Self {
        self.proxy_id = Some(proxy_id.into());
        self
    }

    /// 동기화 루프를 빌드합니다.
    pub fn build(self) -> Result<ProxySyncer<D>, SyncError> {
        self.config.validate()?;

        let docker = self.docker.ok_or_else(|| SyncError::Config {
            field: "docker_client".to_owned(),
            reason: "docker client must be provided".to_owned(),
        })?;

        let proxy_id = self
            .proxy_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SyncError::Config {
                field: "proxy_id".to_owned(),
                reason: "proxy container id must be provided".to_owned(),
            })?;

        let reconciler = Reconciler::new(Arc::clone(&docker), proxy_id);
        let budget = FailureBudget::new(self.config.max_consecutive_failures);

        Ok(ProxySyncer {
            config: self.config,
            docker,
            reconciler,
            budget,
        })
    }
}

impl<D: DockerClient> Default for ProxySyncerBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}
