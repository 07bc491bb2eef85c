//! Validated service configuration.

use std::net::IpAddr;
use std::time::Duration;

use alloy_primitives::Address;
use backon::ConstantBuilder;
use url::Url;

use crate::error::{IndexerError, Result};

/// Default interval between scan passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of L1 blocks fetched per event-filter window.
pub const DEFAULT_BLOCK_BATCH_SIZE: u64 = 50;

/// Default delay between retry attempts.
pub const DEFAULT_BACKOFF_RETRY_INTERVAL: Duration = Duration::from_secs(12);

/// Default maximum number of retries after the initial attempt.
pub const DEFAULT_BACKOFF_MAX_RETRIES: usize = 5;

/// Validated top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the L1 execution-layer RPC endpoint.
    pub l1_rpc: Url,
    /// Base URL of the beacon node's REST API.
    pub beacon_url: Url,
    /// Address of the rollup inbox contract on L1.
    pub inbox_address: Address,
    /// Database connection string.
    pub database_url: String,
    /// Maximum database connections.
    pub database_max_connections: u32,
    /// Timeout applied to every L1 RPC and beacon HTTP request.
    pub rpc_timeout: Duration,
    /// Scan-loop tuning.
    pub indexer: IndexerConfig,
    /// Metrics server configuration.
    pub metrics: MetricsConfig,
}

/// Scan-loop configuration consumed by [`crate::Indexer`].
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Interval between scan passes.
    pub poll_interval: Duration,
    /// Number of blocks per filter window.
    pub block_batch_size: u64,
    /// Block height to start from when the store is empty; falls back to the
    /// contract's genesis height when unset.
    pub start_block: Option<u64>,
    /// Retry policy for per-event processing.
    pub retry: RetryConfig,
}

/// Constant-interval retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay between attempts.
    pub backoff_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_BACKOFF_MAX_RETRIES,
            backoff_interval: DEFAULT_BACKOFF_RETRY_INTERVAL,
        }
    }
}

impl RetryConfig {
    /// Creates a `backon` [`ConstantBuilder`] from this configuration.
    pub fn to_backoff_builder(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.backoff_interval)
            .with_max_times(self.max_retries)
    }
}

/// Metrics server configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether to expose a Prometheus endpoint.
    pub enabled: bool,
    /// Bind address for the metrics server.
    pub addr: IpAddr,
    /// Bind port for the metrics server.
    pub port: u16,
}

/// Validate that a URL has a scheme and host.
pub fn validate_url(url: &Url, field: &'static str) -> Result<()> {
    if url.scheme().is_empty() {
        return Err(IndexerError::Config(format!("{field} URL is missing a scheme")));
    }
    if url.host().is_none() {
        return Err(IndexerError::Config(format!("{field} URL is missing a host")));
    }
    Ok(())
}

impl Config {
    /// Checks cross-field invariants the CLI layer cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.l1_rpc, "l1-rpc")?;
        validate_url(&self.beacon_url, "beacon-url")?;

        if self.indexer.block_batch_size == 0 {
            return Err(IndexerError::Config("block-batch-size must be non-zero".into()));
        }
        if self.indexer.poll_interval.is_zero() {
            return Err(IndexerError::Config("poll-interval must be non-zero".into()));
        }
        if self.database_max_connections == 0 {
            return Err(IndexerError::Config("database-max-connections must be non-zero".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            l1_rpc: "http://localhost:8545".parse().unwrap(),
            beacon_url: "http://localhost:5052".parse().unwrap(),
            inbox_address: Address::ZERO,
            database_url: "postgresql://localhost/blob_indexer".into(),
            database_max_connections: 10,
            rpc_timeout: Duration::from_secs(30),
            indexer: IndexerConfig {
                poll_interval: DEFAULT_POLL_INTERVAL,
                block_batch_size: DEFAULT_BLOCK_BATCH_SIZE,
                start_block: None,
                retry: RetryConfig::default(),
            },
            metrics: MetricsConfig { enabled: false, addr: "127.0.0.1".parse().unwrap(), port: 9090 },
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = base_config();
        config.indexer.block_batch_size = 0;
        assert!(matches!(config.validate(), Err(IndexerError::Config(_))));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = base_config();
        config.indexer.poll_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(IndexerError::Config(_))));
    }

    #[test]
    fn url_without_host_is_rejected() {
        let url = Url::parse("file:///some/path").unwrap();
        assert!(matches!(validate_url(&url, "l1-rpc"), Err(IndexerError::Config(_))));
    }

    #[test]
    fn retry_config_builds_a_backoff() {
        let config = RetryConfig { max_retries: 3, backoff_interval: Duration::from_millis(50) };
        let _ = config.to_backoff_builder();
    }
}
