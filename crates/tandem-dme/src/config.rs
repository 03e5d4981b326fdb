//! Engine configuration.

use crate::error::{DmeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tandem_core::NodeId;

/// How long `acquire` waits for the peer's REPLY by default.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 10_000;

/// Configuration for one engine instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// This node.
    pub self_id: NodeId,
    /// The sole correspondent.
    pub peer_id: NodeId,
    /// Upper bound on one `acquire` (in milliseconds).
    pub acquire_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            self_id: NodeId(1),
            peer_id: NodeId(2),
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.self_id == self.peer_id {
            return Err(DmeError::InvalidConfig(format!(
                "self id and peer id are both {}",
                self.self_id
            )));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(DmeError::InvalidConfig(
                "acquire timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for engine configuration.
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn self_id(mut self, id: u32) -> Self {
        self.config.self_id = NodeId(id);
        self
    }

    pub fn peer_id(mut self, id: u32) -> Self {
        self.config.peer_id = NodeId(id);
        self
    }

    /// Saturates at `u64::MAX` milliseconds.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn acquire_timeout_ms(mut self, ms: u64) -> Self {
        self.config.acquire_timeout_ms = ms;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.self_id, NodeId(1));
        assert_eq!(config.peer_id, NodeId(2));
        assert_eq!(config.acquire_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfigBuilder::new()
            .self_id(2)
            .peer_id(1)
            .acquire_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.self_id, NodeId(2));
        assert_eq!(config.peer_id, NodeId(1));
        assert_eq!(config.acquire_timeout_ms, 5000);
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let config = EngineConfigBuilder::new()
            .acquire_timeout(Duration::from_secs(u64::MAX))
            .build();
        assert_eq!(config.acquire_timeout_ms, u64::MAX);
        assert!(config.validate().is_ok());

        let config = EngineConfigBuilder::new()
            .acquire_timeout(Duration::from_millis(u64::MAX))
            .build();
        assert_eq!(config.acquire_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_same_ids_rejected() {
        let config = EngineConfigBuilder::new().self_id(3).peer_id(3).build();
        assert!(matches!(config.validate(), Err(DmeError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = EngineConfigBuilder::new().acquire_timeout_ms(0).build();
        assert!(matches!(config.validate(), Err(DmeError::InvalidConfig(_))));
    }

    #[test]
    fn test_serde() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"self_id":1,"peer_id":2,"acquire_timeout_ms":10000}"#
        );
    }
}
