//! 설정 관리 — proxysync.toml 파싱 및 런타임 설정
//!
//! [`ProxySyncConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PROXYSYNC_SYNC_PROXY_CONTAINER=traefik` 형식)
//! 3. 설정 파일 (`proxysync.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), proxysync_core::error::ProxySyncError> {
//! use proxysync_core::config::ProxySyncConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ProxySyncConfig::load("proxysync.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ProxySyncConfig::parse("[sync]\nproxy_container = \"edge\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ProxySyncError};

/// 허용되는 트리거 이벤트 집합 이름
pub const VALID_TRIGGERS: [&str; 3] = ["membership", "lifecycle", "all"];

/// 연속 실패 허용 횟수 상한
pub const MAX_CONSECUTIVE_FAILURES: u32 = 1000;

/// 재구독 대기 시간 상한 (밀리초)
pub const MAX_RESUBSCRIBE_BACKOFF_MS: u64 = 60_000;

/// proxysync 통합 설정
///
/// `proxysync.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxySyncConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 연결 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 네트워크 동기화 설정
    #[serde(default)]
    pub sync: SyncConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ProxySyncConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProxySyncError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 기본값에 환경변수 오버라이드만 적용합니다 (설정 파일 없이 실행할 때).
    pub fn from_env() -> Result<Self, ProxySyncError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ProxySyncError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProxySyncError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ProxySyncError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ProxySyncError> {
        toml::from_str(toml_str).map_err(|e| {
            ProxySyncError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PROXYSYNC_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PROXYSYNC_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PROXYSYNC_GENERAL_LOG_FORMAT");

        // Docker
        override_string(&mut self.docker.socket, "PROXYSYNC_DOCKER_SOCKET");
        override_u64(&mut self.docker.timeout_secs, "PROXYSYNC_DOCKER_TIMEOUT_SECS");

        // Sync
        override_string(
            &mut self.sync.proxy_container,
            "PROXYSYNC_SYNC_PROXY_CONTAINER",
        );
        override_string(&mut self.sync.trigger, "PROXYSYNC_SYNC_TRIGGER");
        override_u32(
            &mut self.sync.max_consecutive_failures,
            "PROXYSYNC_SYNC_MAX_CONSECUTIVE_FAILURES",
        );
        override_u64(
            &mut self.sync.resubscribe_backoff_ms,
            "PROXYSYNC_SYNC_RESUBSCRIBE_BACKOFF_MS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "PROXYSYNC_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "PROXYSYNC_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "PROXYSYNC_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ProxySyncError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.docker.socket.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "docker.socket".to_owned(),
                reason: "socket path must not be empty".to_owned(),
            }
            .into());
        }

        if self.docker.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "docker.timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.sync.proxy_container.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.proxy_container".to_owned(),
                reason: "proxy container name must not be empty".to_owned(),
            }
            .into());
        }

        if !VALID_TRIGGERS.contains(&self.sync.trigger.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "sync.trigger".to_owned(),
                reason: format!("must be one of: {}", VALID_TRIGGERS.join(", ")),
            }
            .into());
        }

        if self.sync.max_consecutive_failures == 0
            || self.sync.max_consecutive_failures > MAX_CONSECUTIVE_FAILURES
        {
            return Err(ConfigError::InvalidValue {
                field: "sync.max_consecutive_failures".to_owned(),
                reason: format!("must be 1-{MAX_CONSECUTIVE_FAILURES}"),
            }
            .into());
        }

        if self.sync.resubscribe_backoff_ms > MAX_RESUBSCRIBE_BACKOFF_MS {
            return Err(ConfigError::InvalidValue {
                field: "sync.resubscribe_backoff_ms".to_owned(),
                reason: format!("must be 0-{MAX_RESUBSCRIBE_BACKOFF_MS}"),
            }
            .into());
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "port must not be 0 when metrics are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Docker 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로
    pub socket: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: "/var/run/docker.sock".to_owned(),
            timeout_secs: 120,
        }
    }
}

/// 네트워크 동기화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 동기화할 프록시 컨테이너 이름
    pub proxy_container: String,
    /// 사이클을 트리거하는 이벤트 집합 (membership, lifecycle, all)
    pub trigger: String,
    /// 프로세스 종료 전 허용되는 연속 실패 횟수
    pub max_consecutive_failures: u32,
    /// 이벤트 스트림 재구독 대기 시간 (밀리초)
    pub resubscribe_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            proxy_container: "falcon-proxy".to_owned(),
            trigger: "membership".to_owned(),
            max_consecutive_failures: 10,
            resubscribe_backoff_ms: 1000,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9469,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
