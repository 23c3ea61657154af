//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   ProxySyncer    │
//! └────────┬─────────┘
//!          │
//!   ┌──────▼──────┐
//!   │ Reconciler  │
//!   └──────┬──────┘
//!          ▼
//!   ┌─────────────┐
//!   │DockerClient │ (trait)
//!   └─────────────┘
//!        │     │
//!        ▼     ▼
//!   ┌───────┐ ┌────┐
//!   │Bollard│ │Mock│
//!   └───┬───┘ └────┘
//!       │
//!       ▼
//!   Docker Daemon
//! ```
//!
//! # Identifier Validation
//!
//! Methods that accept identifiers validate them before any API call:
//! - Container IDs: 1-64 ASCII hex digits
//! - Network IDs and container names: 1-128 characters of `[A-Za-z0-9_.-]`
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use proxysync_network_sync::{BollardDockerClient, DockerClient};
//!
//! let client =
//!     Arc::new(BollardDockerClient::connect_with_socket("/var/run/docker.sock", 120).await?);
//! let networks = client.list_networks().await?;
//! # Ok::<(), proxysync_network_sync::SyncError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::future;
use futures_util::stream::BoxStream;

use proxysync_core::types::{EndpointInfo, NetworkAction, NetworkEvent, NetworkInfo};

use crate::error::SyncError;
use crate::event::TriggerSet;

/// Stream of network events delivered by [`DockerClient::network_events`].
pub type NetworkEventStream = BoxStream<'static, Result<NetworkEvent, SyncError>>;

/// Validates a container ID to prevent injection attacks.
///
/// Docker container IDs are 64-character hex strings (or shorter prefix forms).
fn validate_container_id(id: &str) -> Result<(), SyncError> {
    if id.is_empty() || id.len() > 64 {
        return Err(SyncError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SyncError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Validates a network ID or container name.
fn validate_identifier(kind: &str, value: &str) -> Result<(), SyncError> {
    if value.is_empty() || value.len() > 128 {
        return Err(SyncError::DockerApi(format!(
            "invalid {kind}: length {} (must be 1-128)",
            value.len()
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(SyncError::DockerApi(format!(
            "invalid {kind}: contains unsupported characters"
        )));
    }
    Ok(())
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// Trait abstracting the Docker API operations the syncer needs.
///
/// The trait is `Send + Sync + 'static`, allowing safe sharing across async contexts.
///
/// # Implementations
///
/// - [`BollardDockerClient`]: Production implementation using the `bollard` library
/// - `MockDockerClient`: Stateful test implementation (available in tests only)
///
/// # Error Handling
///
/// - **404 errors**: `SyncError::NetworkNotFound` / `SyncError::ContainerNotFound`
/// - **Connection errors**: `SyncError::DockerConnection`
/// - **Read failures**: `SyncError::DockerApi`
/// - **Mutation failures**: `SyncError::JoinFailed` / `SyncError::LeaveFailed`
pub trait DockerClient: Send + Sync + 'static {
    /// Lists every network on the host in summary form.
    ///
    /// Summaries may omit member containers; use
    /// [`inspect_network`](Self::inspect_network) for an accurate member list.
    fn list_networks(&self) -> impl Future<Output = Result<Vec<NetworkInfo>, SyncError>> + Send;

    /// Fetches full detail (driver, options, live members) for one network.
    ///
    /// # Errors
    ///
    /// - `SyncError::NetworkNotFound`: Network does not exist (404)
    /// - `SyncError::DockerApi`: Invalid ID or other API errors
    fn inspect_network(
        &self,
        network_id: &str,
    ) -> impl Future<Output = Result<NetworkInfo, SyncError>> + Send;

    /// Returns the IDs of networks the container is currently attached to.
    ///
    /// # Errors
    ///
    /// - `SyncError::ContainerNotFound`: Container does not exist (404)
    fn container_networks(
        &self,
        container_id: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, SyncError>> + Send;

    /// Returns the full IDs of all containers (running or not) named exactly `name`.
    fn find_containers_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<String>, SyncError>> + Send;

    /// Connects a container to a network with default endpoint settings.
    ///
    /// # Errors
    ///
    /// - `SyncError::JoinFailed`: The daemon rejected the connect call
    fn connect_network(
        &self,
        network_id: &str,
        container_id: &str,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Disconnects a container from a network.
    ///
    /// Uses `force: true` so active endpoints are removed as well.
    ///
    /// # Errors
    ///
    /// - `SyncError::LeaveFailed`: The daemon rejected the disconnect call
    fn disconnect_network(
        &self,
        network_id: &str,
        container_id: &str,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Subscribes to `type=network` events restricted to the actions in `trigger`.
    ///
    /// The stream yields `Err` for transport failures and ends when the
    /// daemon closes the connection.
    fn network_events(&self, trigger: TriggerSet) -> NetworkEventStream;

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::DockerConnection` if the daemon is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Communicates with the Docker daemon via a Unix socket. Internally uses
/// `Arc<bollard::Docker>` for safe sharing across async tasks.
///
/// # Examples
///
/// ```ignore
/// use proxysync_network_sync::BollardDockerClient;
///
/// let client = BollardDockerClient::connect_with_socket("/run/docker.sock", 120).await?;
/// # Ok::<(), proxysync_network_sync::SyncError>(())
/// ```
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using a specific socket path and request timeout.
    ///
    /// The API version is negotiated with the daemon, so older engines that
    /// reject bollard's default version still work.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::DockerConnection` if the client cannot be created
    /// or the daemon does not answer the version request.
    pub async fn connect_with_socket(
        socket_path: &str,
        timeout_secs: u64,
    ) -> Result<Self, SyncError> {
        let docker = bollard::Docker::connect_with_socket(
            socket_path,
            timeout_secs,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            SyncError::DockerConnection(format!(
                "failed to connect to docker at {socket_path}: {e}"
            ))
        })?;

        let docker = docker.negotiate_version().await.map_err(|e| {
            SyncError::DockerConnection(format!(
                "api version negotiation with {socket_path} failed: {e}"
            ))
        })?;
        tracing::debug!(
            socket = socket_path,
            api_version = ?docker.client_version(),
            "negotiated docker api version"
        );

        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

fn network_from_model(network: bollard::models::Network) -> NetworkInfo {
    let options: BTreeMap<String, String> =
        network.options.unwrap_or_default().into_iter().collect();
    let containers = network
        .containers
        .unwrap_or_default()
        .into_iter()
        .map(|(id, c)| {
            (
                id,
                EndpointInfo {
                    name: c.name.unwrap_or_default(),
                    endpoint_id: c.endpoint_id.unwrap_or_default(),
                    ipv4_address: c.ipv4_address.unwrap_or_default(),
                },
            )
        })
        .collect();

    NetworkInfo {
        id: network.id.unwrap_or_default(),
        name: network.name.unwrap_or_default(),
        driver: network.driver.unwrap_or_default(),
        options,
        containers,
    }
}

/// Converts a raw daemon event into a [`NetworkEvent`].
///
/// Returns `None` for events with an unknown action or without an actor ID.
fn network_event_from_message(message: bollard::models::EventMessage) -> Option<NetworkEvent> {
    let action: NetworkAction = message.action?.parse().ok()?;
    let network_id = message.actor.and_then(|a| a.id)?;
    Some(NetworkEvent::new(action, network_id))
}

impl DockerClient for BollardDockerClient {
    async fn list_networks(&self) -> Result<Vec<NetworkInfo>, SyncError> {
        use bollard::network::ListNetworksOptions;

        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(|e| SyncError::DockerApi(format!("list networks failed: {e}")))?;

        Ok(networks.into_iter().map(network_from_model).collect())
    }

    async fn inspect_network(&self, network_id: &str) -> Result<NetworkInfo, SyncError> {
        validate_identifier("network ID", network_id)?;

        use bollard::network::InspectNetworkOptions;

        let network = self
            .docker
            .inspect_network(network_id, None::<InspectNetworkOptions<String>>)
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    SyncError::NetworkNotFound(network_id.to_owned())
                } else {
                    SyncError::DockerApi(format!("inspect network '{network_id}' failed: {e}"))
                }
            })?;

        Ok(network_from_model(network))
    }

    async fn container_networks(&self, container_id: &str) -> Result<BTreeSet<String>, SyncError> {
        validate_container_id(container_id)?;

        let details = self
            .docker
            .inspect_container(container_id, None)
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    SyncError::ContainerNotFound(container_id.to_owned())
                } else {
                    SyncError::DockerApi(format!("inspect container failed: {e}"))
                }
            })?;

        // Keys of `Networks` are network names; the endpoint carries the ID.
        let networks = details
            .network_settings
            .and_then(|s| s.networks)
            .unwrap_or_default()
            .into_values()
            .filter_map(|endpoint| endpoint.network_id)
            .filter(|id| !id.is_empty())
            .collect();

        Ok(networks)
    }

    async fn find_containers_by_name(&self, name: &str) -> Result<Vec<String>, SyncError> {
        validate_identifier("container name", name)?;

        use bollard::container::ListContainersOptions;

        let mut filters = HashMap::new();
        filters.insert("name".to_owned(), vec![name.to_owned()]);
        let options = ListContainersOptions::<String> {
            all: true,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| SyncError::DockerApi(format!("list containers failed: {e}")))?;

        // The daemon's name filter is a substring match; keep exact names only.
        let ids = containers
            .into_iter()
            .filter(|c| {
                c.names
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .any(|n| n.trim_start_matches('/') == name)
            })
            .filter_map(|c| c.id)
            .collect();

        Ok(ids)
    }

    async fn connect_network(&self, network_id: &str, container_id: &str) -> Result<(), SyncError> {
        validate_identifier("network ID", network_id)?;
        validate_container_id(container_id)?;

        use bollard::models::EndpointSettings;
        use bollard::network::ConnectNetworkOptions;

        self.docker
            .connect_network(
                network_id,
                ConnectNetworkOptions {
                    container: container_id.to_owned(),
                    endpoint_config: EndpointSettings::default(),
                },
            )
            .await
            .map_err(|e| SyncError::JoinFailed {
                network_id: network_id.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn disconnect_network(
        &self,
        network_id: &str,
        container_id: &str,
    ) -> Result<(), SyncError> {
        validate_identifier("network ID", network_id)?;
        validate_container_id(container_id)?;

        use bollard::network::DisconnectNetworkOptions;

        self.docker
            .disconnect_network(
                network_id,
                DisconnectNetworkOptions {
                    container: container_id.to_owned(),
                    force: true,
                },
            )
            .await
            .map_err(|e| SyncError::LeaveFailed {
                network_id: network_id.to_owned(),
                reason: e.to_string(),
            })
    }

    fn network_events(&self, trigger: TriggerSet) -> NetworkEventStream {
        use bollard::system::EventsOptions;

        let options = EventsOptions::<String> {
            filters: trigger.filters(),
            ..Default::default()
        };

        self.docker
            .events(Some(options))
            .filter_map(|item| {
                future::ready(match item {
                    Ok(message) => network_event_from_message(message).map(Ok),
                    Err(e) => Some(Err(SyncError::EventStream(e.to_string()))),
                })
            })
            .boxed()
    }

    async fn ping(&self) -> Result<(), SyncError> {
        self.docker
            .ping()
            .await
            .map_err(|e| SyncError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 네트워크와 멤버십을 내부 상태로 보관하고, connect/disconnect 호출을
/// 실제 데몬처럼 상태에 반영합니다. 실패는 플래그로 시뮬레이션합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    state: tokio::sync::Mutex<MockState>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    networks: BTreeMap<String, NetworkInfo>,
    containers: Vec<(String, String)>,
    events: Vec<NetworkEvent>,
    fail_list: bool,
    list_script: std::collections::VecDeque<bool>,
    fail_inspect: BTreeSet<String>,
    fail_container: bool,
    fail_connect: BTreeSet<String>,
    fail_disconnect: BTreeSet<String>,
    mutations: Vec<String>,
}

#[cfg(test)]
impl MockDockerClient {
    /// 빈 상태로 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 네트워크를 추가합니다.
    pub fn with_network(mut self, network: NetworkInfo) -> Self {
        self.state
            .get_mut()
            .networks
            .insert(network.id.clone(), network);
        self
    }

    /// 이름이 있는 컨테이너를 추가합니다.
    pub fn with_container(mut self, id: &str, name: &str) -> Self {
        self.state
            .get_mut()
            .containers
            .push((id.to_owned(), name.to_owned()));
        self
    }

    /// 첫 구독 시 전달할 이벤트를 설정합니다.
    pub fn with_events(mut self, events: Vec<NetworkEvent>) -> Self {
        self.state.get_mut().events = events;
        self
    }

    /// 네트워크 목록 조회 실패를 설정합니다.
    pub async fn set_fail_list(&self, fail: bool) {
        self.state.lock().await.fail_list = fail;
    }

    /// 이후 목록 조회 결과를 순서대로 지정합니다 (`true` = 실패).
    ///
    /// 스크립트가 소진되면 `set_fail_list` 플래그를 따릅니다.
    pub fn with_list_script(mut self, script: Vec<bool>) -> Self {
        self.state.get_mut().list_script = script.into();
        self
    }

    /// 특정 네트워크 상세 조회 실패를 설정합니다.
    pub async fn fail_inspect(&self, network_id: &str) {
        self.state
            .lock()
            .await
            .fail_inspect
            .insert(network_id.to_owned());
    }

    /// 컨테이너 조회 실패를 설정합니다.
    pub async fn set_fail_container(&self, fail: bool) {
        self.state.lock().await.fail_container = fail;
    }

    /// 특정 네트워크 connect 실패를 설정합니다.
    pub async fn fail_connect(&self, network_id: &str) {
        self.state
            .lock()
            .await
            .fail_connect
            .insert(network_id.to_owned());
    }

    /// 특정 네트워크 disconnect 실패를 설정합니다.
    pub async fn fail_disconnect(&self, network_id: &str) {
        self.state
            .lock()
            .await
            .fail_disconnect
            .insert(network_id.to_owned());
    }

    /// 외부에서 컨테이너를 네트워크에 연결합니다 (다른 컨테이너의 활동 시뮬레이션).
    pub async fn attach(&self, network_id: &str, container_id: &str) {
        if let Some(net) = self.state.lock().await.networks.get_mut(network_id) {
            net.containers
                .insert(container_id.to_owned(), EndpointInfo::default());
        }
    }

    /// 지금까지 수행된 connect/disconnect 호출 기록 (`join:<id>` / `leave:<id>`)
    pub async fn mutations(&self) -> Vec<String> {
        self.state.lock().await.mutations.clone()
    }

    /// 특정 네트워크의 현재 멤버 목록
    pub async fn members(&self, network_id: &str) -> BTreeSet<String> {
        self.state
            .lock()
            .await
            .networks
            .get(network_id)
            .map(|n| n.containers.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_networks(&self) -> Result<Vec<NetworkInfo>, SyncError> {
        let mut state = self.state.lock().await;
        let fail = state.list_script.pop_front().unwrap_or(state.fail_list);
        if fail {
            return Err(SyncError::DockerApi("mock list failure".to_owned()));
        }
        // Summaries omit members, like the daemon does.
        Ok(state
            .networks
            .values()
            .map(|n| NetworkInfo {
                containers: BTreeMap::new(),
                ..n.clone()
            })
            .collect())
    }

    async fn inspect_network(&self, network_id: &str) -> Result<NetworkInfo, SyncError> {
        let state = self.state.lock().await;
        if state.fail_inspect.contains(network_id) {
            return Err(SyncError::DockerApi("mock inspect failure".to_owned()));
        }
        state
            .networks
            .get(network_id)
            .cloned()
            .ok_or_else(|| SyncError::NetworkNotFound(network_id.to_owned()))
    }

    async fn container_networks(&self, container_id: &str) -> Result<BTreeSet<String>, SyncError> {
        let state = self.state.lock().await;
        if state.fail_container || !state.containers.iter().any(|(id, _)| id == container_id) {
            return Err(SyncError::ContainerNotFound(container_id.to_owned()));
        }
        Ok(state
            .networks
            .values()
            .filter(|n| n.has_member(container_id))
            .map(|n| n.id.clone())
            .collect())
    }

    async fn find_containers_by_name(&self, name: &str) -> Result<Vec<String>, SyncError> {
        let state = self.state.lock().await;
        Ok(state
            .containers
            .iter()
            .filter(|(_, n)| n == name)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn connect_network(&self, network_id: &str, container_id: &str) -> Result<(), SyncError> {
        let mut state = self.state.lock().await;
        state.mutations.push(format!("join:{network_id}"));
        if state.fail_connect.contains(network_id) {
            return Err(SyncError::JoinFailed {
                network_id: network_id.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        let net = state
            .networks
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
        let mut state = self.state.lock().await;
        state.mutations.push(format!("leave:{network_id}"));
        if state.fail_disconnect.contains(network_id) {
            return Err(SyncError::LeaveFailed {
                network_id: network_id.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        if let Some(net) = state.networks.get_mut(network_id) {
            net.containers.remove(container_id);
        }
        Ok(())
    }

    fn network_events(&self, trigger: TriggerSet) -> NetworkEventStream {
        let pending = match self.state.try_lock() {
            Ok(mut s) => std::mem::take(&mut s.events),
            Err(_) => Vec::new(),
        };
        let events: Vec<_> = pending
            .into_iter()
            .filter(|e| trigger.matches(e.action))
            .map(Ok)
            .collect();
        futures_util::stream::iter(events)
            .chain(futures_util::stream::pending())
            .boxed()
    }

    async fn ping(&self) -> Result<(), SyncError> {
        Ok(())
    }
}
