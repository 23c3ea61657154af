//! 네트워크 동기화 설정
//!
//! [`NetworkSyncConfig`]는 core의 [`SyncConfig`](proxysync_core::config::SyncConfig)를
//! 기반으로 동기화 루프 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use proxysync_core::config::ProxySyncConfig;
//! use proxysync_network_sync::config::NetworkSyncConfig;
//!
//! let core_config = ProxySyncConfig::default();
//! let config = NetworkSyncConfig::from_core(&core_config.sync)?;
//! ```

use std::time::Duration;

use proxysync_core::config::{MAX_CONSECUTIVE_FAILURES, MAX_RESUBSCRIBE_BACKOFF_MS};

use crate::error::SyncError;
use crate::event::TriggerSet;


/// 네트워크 동기화 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSyncConfig {
    /// 프록시 컨테이너 이름
    pub proxy_container: String,
    /// 사이클을 트리거하는 이벤트 집합
    pub trigger: TriggerSet,
    /// 연속 실패 허용 횟수 (이 값을 초과하면 루프 종료)
    pub max_consecutive_failures: u32,
    /// 이벤트 스트림 재구독 대기 시간 (밀리초)
    pub resubscribe_backoff_ms: u64,
}

impl Default for NetworkSyncConfig {
    fn default() -> Self {
        Self {
            proxy_container: "falcon-proxy".to_owned(),
            trigger: TriggerSet::Membership,
            max_consecutive_failures: 10,
            resubscribe_backoff_ms: 1000,
        }
    }
}

impl NetworkSyncConfig {
    /// core의 `SyncConfig`에서 동기화 설정을 생성합니다.
    pub fn from_core(core: &proxysync_core::config::SyncConfig) -> Result<Self, SyncError> {
        let config = Self {
            proxy_container: core.proxy_container.clone(),
            trigger: core.trigger.parse()?,
            max_consecutive_failures: core.max_consecutive_failures,
            resubscribe_backoff_ms: core.resubscribe_backoff_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// 재구독 대기 시간
    pub fn resubscribe_backoff(&self) -> Duration {
        Duration::from_millis(self.resubscribe_backoff_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.proxy_container.trim().is_empty() {
            return Err(SyncError::Config {
                field: "proxy_container".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.max_consecutive_failures == 0
            || self.max_consecutive_failures > MAX_CONSECUTIVE_FAILURES
        {
            return Err(SyncError::Config {
                field: "max_consecutive_failures".to_owned(),
                reason: format!("must be 1-{MAX_CONSECUTIVE_FAILURES}"),
            });
        }

        if self.resubscribe_backoff_ms > MAX_RESUBSCRIBE_BACKOFF_MS {
            return Err(SyncError::Config {
                field: "resubscribe_backoff_ms".to_owned(),
                reason: format!("must be 0-{MAX_RESUBSCRIBE_BACKOFF_MS}"),
            });
        }

        Ok(())
    }
}

/// 네트워크 동기화 설정 빌더
#[derive(Default)]
pub struct NetworkSyncConfigBuilder {
    config: NetworkSyncConfig,
}

impl NetworkSyncConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 프록시 컨테이너 이름을 설정합니다.
    pub fn proxy_container(mut self, name: impl Into<String>) -> Self {
        self.config.proxy_container = name.into();
        self
    }

    /// 트리거 이벤트 집합을 설정합니다.
    pub fn trigger(mut self, trigger: TriggerSet) -> Self {
        self.config.trigger = trigger;
        self
    }

    /// 연속 실패 허용 횟수를 설정합니다.
    pub fn max_consecutive_failures(mut self, max: u32) -> Self {
        self.config.max_consecutive_failures = max;
        self
    }

    /// 재구독 대기 시간(밀리초)을 설정합니다.
    pub fn resubscribe_backoff_ms(mut self, ms: u64) -> Self {
        self.config.resubscribe_backoff_ms = ms;
        self
    }

    /// 설정을 검증하고 `NetworkSyncConfig`를 생성합니다.
    pub fn build(self) -> Result<NetworkSyncConfig, SyncError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        NetworkSyncConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = proxysync_core::config::SyncConfig {
            proxy_container: "traefik".to_owned(),
            trigger: "all".to_owned(),
            max_consecutive_failures: 3,
            resubscribe_backoff_ms: 250,
        };
        let config = NetworkSyncConfig::from_core(&core).unwrap();
        assert_eq!(config.proxy_container, "traefik");
        assert_eq!(config.trigger, TriggerSet::All);
        assert_eq!(config.max_consecutive_failures, 3);
        assert_eq!(config.resubscribe_backoff(), Duration::from_millis(250));
    }

    #[test]
    fn from_core_rejects_unknown_trigger() {
        let core = proxysync_core::config::SyncConfig {
            trigger: "sometimes".to_owned(),
            ..Default::default()
        };
        assert!(NetworkSyncConfig::from_core(&core).is_err());
    }

    #[test]
    fn builder_chaining() {
        let config = NetworkSyncConfigBuilder::new()
            .proxy_container("edge")
            .trigger(TriggerSet::Lifecycle)
            .max_consecutive_failures(5)
            .resubscribe_backoff_ms(0)
            .build()
            .unwrap();
        assert_eq!(config.proxy_container, "edge");
        assert_eq!(config.trigger, TriggerSet::Lifecycle);
        assert_eq!(config.max_consecutive_failures, 5);
        assert_eq!(config.resubscribe_backoff_ms, 0);
    }

    #[test]
    fn rejects_empty_proxy_name() {
        let result = NetworkSyncConfigBuilder::new().proxy_container("").build();
        assert!(matches!(result, Err(SyncError::Config { .. })));
    }

    #[test]
    fn rejects_zero_failure_budget() {
        let result = NetworkSyncConfigBuilder::new()
            .max_consecutive_failures(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_excessive_failure_budget() {
        let result = NetworkSyncConfigBuilder::new()
            .max_consecutive_failures(MAX_CONSECUTIVE_FAILURES + 1)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_excessive_backoff() {
        let result = NetworkSyncConfigBuilder::new()
            .resubscribe_backoff_ms(MAX_RESUBSCRIBE_BACKOFF_MS + 1)
            .build();
        assert!(result.is_err());
    }
}
