//! 통합 테스트 -- 공개 API로 전체 동기화 플로우 검증
//!
//! 이벤트 수신 → 멤버십 조회 → join/leave 적용 → 연속 실패 관리
//! 시나리오를 실제 이벤트 채널을 사용하여 테스트합니다.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proxysync_core::types::{DEFAULT_BRIDGE_OPTION, NetworkAction, NetworkEvent, NetworkInfo};
use proxysync_network_sync::{
    DockerClient, NetworkSyncConfigBuilder, ProxySyncer, ProxySyncerBuilder, Reconciler,
    SyncError, TriggerSet, resolve_proxy_container,
};
use tokio::sync::mpsc;

const PROXY: &str = "aaaa1111";
const PROXY_NAME: &str = "falcon-proxy";

// Fake Docker daemon for integration tests
mod fake {
    use super::*;
    use std::collections::{BTreeMap, VecDeque};

    use futures_util::StreamExt;
    use proxysync_core::types::EndpointInfo;
    use proxysync_network_sync::NetworkEventStream;
    use tokio::sync::Mutex;

    pub type EventSender = mpsc::UnboundedSender<Result<NetworkEvent, SyncError>>;

    #[derive(Default)]
    pub struct FakeDocker {
        networks: Mutex<BTreeMap<String, NetworkInfo>>,
        containers: Mutex<Vec<(String, String)>>,
        fail_reads: Mutex<bool>,
        subscriptions:
            std::sync::Mutex<VecDeque<mpsc::UnboundedReceiver<Result<NetworkEvent, SyncError>>>>,
        subscribe_count: std::sync::atomic::AtomicUsize,
    }

    impl FakeDocker {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn add_container(&self, id: &str, name: &str) {
            self.containers
                .lock()
                .await
                .push((id.to_owned(), name.to_owned()));
        }

        pub async fn add_network(&self, network: NetworkInfo) {
            self.networks
                .lock()
                .await
                .insert(network.id.clone(), network);
        }

        pub async fn attach(&self, network_id: &str, container_id: &str) {
            if let Some(net) = self.networks.lock().await.get_mut(network_id) {
                net.containers
                    .insert(container_id.to_owned(), EndpointInfo::default());
            }
        }

        pub async fn set_fail_reads(&self, fail: bool) {
            *self.fail_reads.lock().await = fail;
        }

        /// 다음 구독에 사용할 이벤트 채널을 등록하고 송신측을 반환합니다.
        pub fn push_subscription(&self) -> EventSender {
            let (tx, rx) = mpsc::unbounded_channel();
            if let Ok(mut queue) = self.subscriptions.lock() {
                queue.push_back(rx);
            }
            tx
        }

        pub fn subscribe_count(&self) -> usize {
            self.subscribe_count
                .load(std::sync::atomic::Ordering::SeqCst)
        }

        pub async fn proxy_networks(&self) -> BTreeSet<String> {
            self.networks
                .lock()
                .await
                .values()
                .filter(|n| n.has_member(PROXY))
                .map(|n| n.id.clone())
                .collect()
        }

        async fn check_reads(&self) -> Result<(), SyncError> {
            if *self.fail_reads.lock().await {
                return Err(SyncError::DockerApi("daemon unavailable".to_owned()));
            }
            Ok(())
        }
    }

    impl DockerClient for FakeDocker {
        async fn list_networks(&self) -> Result<Vec<NetworkInfo>, SyncError> {
            self.check_reads().await?;
            Ok(self
                .networks
                .lock()
                .await
                .values()
                .map(|n| NetworkInfo {
                    containers: BTreeMap::new(),
                    ..n.clone()
                })
                .collect())
        }

        async fn inspect_network(&self, network_id: &str) -> Result<NetworkInfo, SyncError> {
            self.check_reads().await?;
            self.networks
                .lock()
                .await
                .get(network_id)
                .cloned()
                .ok_or_else(|| SyncError::NetworkNotFound(network_id.to_owned()))
        }

        async fn container_networks(
            &self,
            container_id: &str,
        ) -> Result<BTreeSet<String>, SyncError> {
            self.check_reads().await?;
            Ok(self
                .networks
                .lock()
                .await
                .values()
                .filter(|n| n.has_member(container_id))
                .map(|n| n.id.clone())
                .collect())
        }

        async fn find_containers_by_name(&self, name: &str) -> Result<Vec<String>, SyncError> {
            Ok(self
                .containers
                .lock()
                .await
                .iter()
                .filter(|(_, n)| n == name)
                .map(|(id, _)| id.clone())
                .collect())
        }

        async fn connect_network(
            &self,
            network_id: &str,
            container_id: &str,
        ) -> Result<(), SyncError> {
            let mut networks = self.networks.lock().await;
            let net = networks
                .get_mut(network_id)
                .ok_or_else(|| SyncError::JoinFailed {
                    network_id: network_id.to_owned(),
                    reason: "no such network".to_owned(),
                })?;
            net.containers
                .insert(container_id.to_owned(), EndpointInfo::default());
            Ok(())
        }

        async fn disconnect_network(
            &self,
            network_id: &str,
            container_id: &str,
        ) -> Result<(), SyncError> {
            if let Some(net) = self.networks.lock().await.get_mut(network_id) {
                net.containers.remove(container_id);
            }
            Ok(())
        }

        fn network_events(&self, trigger: TriggerSet) -> NetworkEventStream {
            self.subscribe_count
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let rx = self
                .subscriptions
                .lock()
                .ok()
                .and_then(|mut queue| queue.pop_front());
            match rx {
                Some(rx) => futures_util::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                })
                .filter(move |item| {
                    let keep = match item {
                        Ok(event) => trigger.matches(event.action),
                        Err(_) => true,
                    };
                    futures_util::future::ready(keep)
                })
                .boxed(),
                None => futures_util::stream::pending().boxed(),
            }
        }

        async fn ping(&self) -> Result<(), SyncError> {
            Ok(())
        }
    }
}

use fake::FakeDocker;

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn build_syncer(docker: Arc<FakeDocker>, max_failures: u32) -> ProxySyncer<FakeDocker> {
    let config = NetworkSyncConfigBuilder::new()
        .proxy_container(PROXY_NAME)
        .trigger(TriggerSet::Membership)
        .max_consecutive_failures(max_failures)
        .resubscribe_backoff_ms(10)
        .build()
        .unwrap();
    ProxySyncerBuilder::new()
        .config(config)
        .docker_client(docker)
        .proxy_id(PROXY)
        .build()
        .unwrap()
}

/// valid = {A, C}, connected = {B, C}
async fn convergence_fixture() -> Arc<FakeDocker> {
    let docker = Arc::new(FakeDocker::new());
    docker.add_container(PROXY, PROXY_NAME).await;
    docker
        .add_network(NetworkInfo::new("A", "app", "bridge").with_member("c1"))
        .await;
    docker
        .add_network(NetworkInfo::new("B", "stale", "bridge").with_member(PROXY))
        .await;
    docker
        .add_network(
            NetworkInfo::new("C", "bridge", "bridge")
                .with_option(DEFAULT_BRIDGE_OPTION, "true")
                .with_member(PROXY),
        )
        .await;
    docker
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn resolve_proxy_by_exact_name() {
    let docker = convergence_fixture().await;
    docker.add_container("bbbb2222", "falcon-proxy-old").await;

    let id = resolve_proxy_container(docker.as_ref(), PROXY_NAME)
        .await
        .unwrap();
    assert_eq!(id, PROXY);
}

#[tokio::test]
async fn resolve_proxy_rejects_duplicates() {
    let docker = convergence_fixture().await;
    docker.add_container("bbbb2222", PROXY_NAME).await;

    let err = resolve_proxy_container(docker.as_ref(), PROXY_NAME)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ProxyLookup { found: 2, .. }));
}

#[tokio::test]
async fn reconcile_converges_and_is_idempotent() {
    let docker = convergence_fixture().await;
    let reconciler = Reconciler::new(Arc::clone(&docker), PROXY);

    let plan = reconciler.reconcile().await.unwrap();
    assert_eq!(plan.to_join, ids(&["A"]));
    assert_eq!(plan.to_leave, ids(&["B"]));
    assert_eq!(docker.proxy_networks().await, ids(&["A", "C"]));

    let again = reconciler.reconcile().await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn run_performs_startup_cycle() {
    let docker = convergence_fixture().await;
    let mut syncer = build_syncer(Arc::clone(&docker), 10);

    let task = tokio::spawn(async move { syncer.run().await });

    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.proxy_networks().await == ids(&["A", "C"]) }
    })
    .await;

    task.abort();
}

#[tokio::test]
async fn run_reacts_to_membership_events() {
    let docker = convergence_fixture().await;
    docker
        .add_network(NetworkInfo::new("D", "late", "bridge"))
        .await;
    let events = docker.push_subscription();
    let mut syncer = build_syncer(Arc::clone(&docker), 10);

    let task = tokio::spawn(async move { syncer.run().await });

    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.proxy_networks().await == ids(&["A", "C"]) }
    })
    .await;

    // another container joins D; the proxy should follow
    docker.attach("D", "c7").await;
    events
        .send(Ok(NetworkEvent::new(NetworkAction::Connect, "D")))
        .unwrap();

    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.proxy_networks().await.contains("D") }
    })
    .await;

    task.abort();
}

#[tokio::test]
async fn run_resubscribes_after_stream_end() {
    let docker = convergence_fixture().await;
    docker
        .add_network(NetworkInfo::new("D", "late", "bridge"))
        .await;
    let first = docker.push_subscription();
    let second = docker.push_subscription();
    let mut syncer = build_syncer(Arc::clone(&docker), 10);

    let task = tokio::spawn(async move { syncer.run().await });

    drop(first);
    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.subscribe_count() >= 2 }
    })
    .await;

    docker.attach("D", "c7").await;
    second
        .send(Ok(NetworkEvent::new(NetworkAction::Connect, "D")))
        .unwrap();

    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.proxy_networks().await.contains("D") }
    })
    .await;

    task.abort();
}

#[tokio::test]
async fn run_terminates_after_budget_exhausted() {
    let docker = convergence_fixture().await;
    docker.set_fail_reads(true).await;
    let events = docker.push_subscription();
    let mut syncer = build_syncer(Arc::clone(&docker), 10);

    let task = tokio::spawn(async move { syncer.run().await });

    // startup failure + 10 event failures = 11
    for i in 0..10 {
        events
            .send(Ok(NetworkEvent::new(NetworkAction::Disconnect, format!("n{i}"))))
            .unwrap();
    }

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("run should terminate")
        .unwrap();
    match outcome {
        Err(SyncError::FailureBudgetExceeded {
            failures,
            last_error,
        }) => {
            assert_eq!(failures, 11);
            assert!(last_error.contains("daemon unavailable"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(never) => match never {},
    }
}

#[tokio::test]
async fn repeated_stream_closures_keep_healthy_loop_alive() {
    let docker = convergence_fixture().await;
    // every subscription closes immediately; all reconciles succeed
    for _ in 0..11 {
        drop(docker.push_subscription());
    }
    let mut syncer = build_syncer(Arc::clone(&docker), 10);

    let task = tokio::spawn(async move { syncer.run().await });

    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.subscribe_count() >= 12 }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!task.is_finished(), "loop exited although every cycle succeeded");
    assert_eq!(docker.proxy_networks().await, ids(&["A", "C"]));

    task.abort();
}

#[tokio::test]
async fn resubscribe_reconciles_changes_missed_while_disconnected() {
    let docker = convergence_fixture().await;
    docker
        .add_network(NetworkInfo::new("D", "late", "bridge"))
        .await;
    let first = docker.push_subscription();
    let mut syncer = build_syncer(Arc::clone(&docker), 10);

    let task = tokio::spawn(async move { syncer.run().await });

    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.proxy_networks().await == ids(&["A", "C"]) }
    })
    .await;

    // the change happens while the stream is down; no event is ever delivered for it
    docker.attach("D", "c7").await;
    drop(first);

    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.proxy_networks().await.contains("D") }
    })
    .await;

    task.abort();
}

#[tokio::test]
async fn failing_resubscribe_cycle_counts_against_budget() {
    let docker = convergence_fixture().await;
    docker.set_fail_reads(true).await;
    let events = docker.push_subscription();
    let mut syncer = build_syncer(Arc::clone(&docker), 1);

    let task = tokio::spawn(async move { syncer.run().await });

    // startup failure (1), stream end, then the resubscribe cycle fails (2)
    drop(events);

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("run should terminate")
        .unwrap();
    match outcome {
        Err(SyncError::FailureBudgetExceeded {
            failures,
            last_error,
        }) => {
            assert_eq!(failures, 2);
            assert!(last_error.contains("daemon unavailable"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(never) => match never {},
    }
    assert_eq!(docker.subscribe_count(), 2);
}

#[tokio::test]
async fn recovery_resets_the_budget() {
    let docker = convergence_fixture().await;
    docker.set_fail_reads(true).await;
    let events = docker.push_subscription();
    let mut syncer = build_syncer(Arc::clone(&docker), 2);

    let task = tokio::spawn(async move { syncer.run().await });

    // startup (1) + one event (2): still within budget
    events
        .send(Ok(NetworkEvent::new(NetworkAction::Connect, "A")))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    docker.set_fail_reads(false).await;
    events
        .send(Ok(NetworkEvent::new(NetworkAction::Connect, "A")))
        .unwrap();
    let d = Arc::clone(&docker);
    wait_until(move || {
        let d = Arc::clone(&d);
        async move { d.proxy_networks().await == ids(&["A", "C"]) }
    })
    .await;

    docker.set_fail_reads(true).await;
    for _ in 0..2 {
        events
            .send(Ok(NetworkEvent::new(NetworkAction::Connect, "A")))
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!task.is_finished());

    task.abort();
}
