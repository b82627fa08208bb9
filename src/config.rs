//! Configuration for the accounting subsystem
//!
//! TOML-backed, serde-derived, every field defaulted so a partial (or
//! missing) config section still yields a working server. The one startup
//! side effect this crate owns is [`ServerConfig::apply_to`], which feeds
//! the configured ceiling into the shared accounter.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::accounting::ResponseDataAccounter;
use crate::constants::{accounting, connection, counter};

/// Configuration validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("shard count must be between 1 and {max}, got {got}", max = counter::MAX_SHARDS)]
    InvalidShardCount { got: usize },

    #[error("connection input buffer size cannot be zero")]
    ZeroInBufferSize,

    #[error("requests queue size threshold cannot be zero")]
    ZeroQueueThreshold,
}

fn default_max_response_data_size_mb() -> u64 {
    // 0 = unlimited sentinel; admission control is opt-in
    0
}

fn default_shards() -> usize {
    counter::DEFAULT_SHARDS
}

fn default_in_buffer_size() -> usize {
    connection::IN_BUFFER_SIZE
}

fn default_requests_queue_size_threshold() -> usize {
    connection::REQUESTS_QUEUE_SIZE_THRESHOLD
}

fn default_keepalive_timeout_secs() -> u64 {
    connection::KEEPALIVE_TIMEOUT_SECS
}

/// Admission-control and counter tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountingConfig {
    /// Ceiling on in-flight response bytes, in MiB. 0 means unlimited.
    #[serde(default = "default_max_response_data_size_mb")]
    pub max_response_data_size_mb: u64,
    /// Shard count for striped counters
    #[serde(default = "default_shards")]
    pub shards: usize,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            max_response_data_size_mb: default_max_response_data_size_mb(),
            shards: default_shards(),
        }
    }
}

impl AccountingConfig {
    /// Ceiling in bytes, with 0 mapped to the unlimited sentinel.
    ///
    /// Saturates instead of wrapping; a value too large to express in
    /// bytes degenerates to the unlimited sentinel rather than to a tiny
    /// wrapped ceiling.
    #[must_use]
    pub fn max_level_bytes(&self) -> u64 {
        if self.max_response_data_size_mb == 0 {
            accounting::UNLIMITED
        } else {
            self.max_response_data_size_mb.saturating_mul(1024 * 1024)
        }
    }
}

/// Connection-layer settings carried through to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Input buffer size per connection in bytes
    #[serde(default = "default_in_buffer_size")]
    pub in_buffer_size: usize,
    /// Pending-request queue length above which reading stops
    #[serde(default = "default_requests_queue_size_threshold")]
    pub requests_queue_size_threshold: usize,
    /// Keep-alive timeout for idle connections in seconds
    #[serde(default = "default_keepalive_timeout_secs")]
    pub keepalive_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            in_buffer_size: default_in_buffer_size(),
            requests_queue_size_threshold: default_requests_queue_size_threshold(),
            keepalive_timeout_secs: default_keepalive_timeout_secs(),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub accounting: AccountingConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl ServerConfig {
    /// Validate field ranges.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.accounting.shards == 0 || self.accounting.shards > counter::MAX_SHARDS {
            return Err(ConfigError::InvalidShardCount {
                got: self.accounting.shards,
            });
        }
        if self.connection.in_buffer_size == 0 {
            return Err(ConfigError::ZeroInBufferSize);
        }
        if self.connection.requests_queue_size_threshold == 0 {
            return Err(ConfigError::ZeroQueueThreshold);
        }
        Ok(())
    }

    /// Build the shared accounter for a listener: latency counters sized to
    /// the configured shard count, ceiling applied.
    #[must_use]
    pub fn build_accounter(&self) -> ResponseDataAccounter {
        let accounter = ResponseDataAccounter::with_shards(self.accounting.shards);
        self.apply_to(&accounter);
        accounter
    }

    /// Push the configured admission ceiling into the shared accounter.
    /// Called once at server/listener startup.
    pub fn apply_to(&self, accounter: &ResponseDataAccounter) {
        let max = self.accounting.max_level_bytes();
        accounter.set_max_level(max);
        if max == accounting::UNLIMITED {
            info!("response data accounting: no admission ceiling configured");
        } else {
            info!(max_bytes = max, "response data accounting ceiling set");
        }
    }
}

/// Load and validate a TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: ServerConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.accounting.max_response_data_size_mb, 0);
        assert_eq!(config.accounting.shards, counter::DEFAULT_SHARDS);
        assert_eq!(config.connection.in_buffer_size, 32 * 1024);
        assert_eq!(config.connection.requests_queue_size_threshold, 100);
        assert_eq!(config.connection.keepalive_timeout_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_means_unlimited() {
        let config = AccountingConfig::default();
        assert_eq!(config.max_level_bytes(), accounting::UNLIMITED);
    }

    #[test]
    fn test_ceiling_in_mebibytes() {
        let config = AccountingConfig {
            max_response_data_size_mb: 64,
            ..Default::default()
        };
        assert_eq!(config.max_level_bytes(), 64 * 1024 * 1024);
    }

    #[test]
    fn test_oversized_ceiling_saturates_to_unlimited() {
        let config = AccountingConfig {
            max_response_data_size_mb: u64::MAX / 2,
            ..Default::default()
        };
        assert_eq!(config.max_level_bytes(), accounting::UNLIMITED);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [accounting]
            max_response_data_size_mb = 128
        "#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.accounting.max_response_data_size_mb, 128);
        // Everything else defaulted
        assert_eq!(config.accounting.shards, counter::DEFAULT_SHARDS);
        assert_eq!(config.connection, ConnectionConfig::default());
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = ServerConfig {
            accounting: AccountingConfig {
                max_response_data_size_mb: 32,
                shards: 8,
            },
            connection: ConnectionConfig {
                in_buffer_size: 16 * 1024,
                requests_queue_size_threshold: 50,
                keepalive_timeout_secs: 120,
            },
        };
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: ServerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_validate_rejects_bad_shards() {
        let mut config = ServerConfig::default();
        config.accounting.shards = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidShardCount { got: 0 })
        );

        config.accounting.shards = counter::MAX_SHARDS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_to_sets_ceiling() {
        let accounter = ResponseDataAccounter::new();
        let config = ServerConfig {
            accounting: AccountingConfig {
                max_response_data_size_mb: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        config.apply_to(&accounter);
        assert_eq!(accounter.max_level(), 1024 * 1024);
    }

    #[test]
    fn test_build_accounter_from_config() {
        let config = ServerConfig {
            accounting: AccountingConfig {
                max_response_data_size_mb: 4,
                shards: 8,
            },
            ..Default::default()
        };
        let accounter = config.build_accounter();
        assert_eq!(accounter.max_level(), 4 * 1024 * 1024);
        assert_eq!(accounter.current_level(), 0);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/inflight.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
