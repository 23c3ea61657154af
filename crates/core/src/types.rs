//! 도메인 타입 — 네트워크 스냅샷과 런타임 이벤트
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 네트워크 스냅샷은 동기화 사이클마다 새로 조회되며 사이클이 끝나면 버려집니다.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 브리지 드라이버 이름
pub const BRIDGE_DRIVER: &str = "bridge";

/// 호스트 기본 브리지 네트워크를 표시하는 드라이버 옵션 키
pub const DEFAULT_BRIDGE_OPTION: &str = "com.docker.network.bridge.default_bridge";

/// 네트워크에 연결된 컨테이너의 엔드포인트 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// 컨테이너 이름
    pub name: String,
    /// 엔드포인트 ID
    pub endpoint_id: String,
    /// IPv4 주소 (CIDR 표기)
    pub ipv4_address: String,
}

/// 네트워크 스냅샷
///
/// `inspect_network` 결과를 나타냅니다. 목록 조회(summary) 결과는
/// `containers`가 비어 있을 수 있으므로 멤버 수 판단에 쓰면 안 됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// 네트워크 ID (호스트 내 고유)
    pub id: String,
    /// 네트워크 이름
    pub name: String,
    /// 드라이버 종류 (bridge, overlay, host, none, macvlan ...)
    pub driver: String,
    /// 드라이버 옵션
    pub options: BTreeMap<String, String>,
    /// 멤버 컨테이너 ID -> 엔드포인트 정보
    pub containers: BTreeMap<String, EndpointInfo>,
}

impl NetworkInfo {
    /// 멤버 없는 네트워크를 생성합니다.
    pub fn new(id: impl Into<String>, name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            driver: driver.into(),
            ..Self::default()
        }
    }

    /// 드라이버 옵션을 추가합니다.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// 멤버 컨테이너를 추가합니다.
    pub fn with_member(mut self, container_id: impl Into<String>) -> Self {
        self.containers
            .insert(container_id.into(), EndpointInfo::default());
        self
    }

    /// 브리지 드라이버 네트워크인지 확인합니다.
    pub fn is_bridge(&self) -> bool {
        self.driver == BRIDGE_DRIVER
    }

    /// 호스트 기본 브리지로 표시되어 있는지 확인합니다.
    pub fn is_default_bridge(&self) -> bool {
        self.options
            .get(DEFAULT_BRIDGE_OPTION)
            .is_some_and(|v| v == "true")
    }

    /// 멤버 컨테이너 수
    pub fn member_count(&self) -> usize {
        self.containers.len()
    }

    /// 주어진 컨테이너가 멤버인지 확인합니다.
    pub fn has_member(&self, container_id: &str) -> bool {
        self.containers.contains_key(container_id)
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) driver={} members={}",
            self.name,
            self.id,
            self.driver,
            self.containers.len(),
        )
    }
}

/// 네트워크 이벤트 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkAction {
    /// 네트워크 생성
    Create,
    /// 네트워크 삭제
    Destroy,
    /// 컨테이너가 네트워크에 연결됨
    Connect,
    /// 컨테이너가 네트워크에서 분리됨
    Disconnect,
}

impl NetworkAction {
    /// Docker 이벤트 API에서 쓰는 액션 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Destroy => "destroy",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for NetworkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "destroy" => Ok(Self::Destroy),
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(format!("unknown network action '{other}'")),
        }
    }
}

/// 런타임 네트워크 이벤트
///
/// 이벤트는 동기화 사이클을 깨우는 신호로만 쓰입니다. 페이로드는 로깅 용도입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEvent {
    /// 이벤트 액션
    pub action: NetworkAction,
    /// 대상 네트워크 ID
    pub network_id: String,
}

impl NetworkEvent {
    /// 새 이벤트를 생성합니다.
    pub fn new(action: NetworkAction, network_id: impl Into<String>) -> Self {
        Self {
            action,
            network_id: network_id.into(),
        }
    }
}

impl fmt::Display for NetworkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network {} {}", self.action, self.network_id)
    }
}
