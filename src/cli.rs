//! CLI argument definitions.

use std::net::IpAddr;
use std::time::Duration;

use alloy_primitives::Address;
use clap::Parser;
use url::Url;

use crate::config::{Config, IndexerConfig, MetricsConfig, RetryConfig};
use crate::error::Result;

/// Blob indexer - archives rollup batch blobs from the beacon chain to PostgreSQL.
#[derive(Parser, Debug, Clone)]
#[command(name = "blob-indexer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// URL of the L1 execution-layer RPC endpoint.
    #[arg(long = "l1-rpc", env = "BLOB_INDEXER_L1_RPC", value_parser = parse_url)]
    pub l1_rpc: Url,

    /// Base URL of the beacon node's REST API.
    #[arg(long = "beacon-url", env = "BLOB_INDEXER_BEACON_URL", value_parser = parse_url)]
    pub beacon_url: Url,

    /// Address of the rollup inbox contract on L1 (0x-prefixed hex).
    #[arg(
        long = "inbox-address",
        env = "BLOB_INDEXER_INBOX_ADDRESS",
        value_parser = parse_address
    )]
    pub inbox_address: Address,

    /// Block height to start indexing from when the database is empty.
    /// Defaults to the contract's genesis height.
    #[arg(long = "start-block", env = "BLOB_INDEXER_START_BLOCK")]
    pub start_block: Option<u64>,

    /// Database URL.
    #[arg(
        long = "database-url",
        env = "DATABASE_URL",
        default_value = "postgresql://localhost/blob_indexer"
    )]
    pub database_url: String,

    /// Maximum database connections.
    #[arg(long = "database-max-connections", env = "DATABASE_MAX_CONNECTIONS", default_value = "10")]
    pub database_max_connections: u32,

    /// Interval between scan passes (e.g., "10s", "1m").
    #[arg(
        long = "poll-interval",
        env = "BLOB_INDEXER_POLL_INTERVAL",
        default_value = "10s",
        value_parser = parse_duration
    )]
    pub poll_interval: Duration,

    /// Number of L1 blocks fetched per event-filter window.
    #[arg(long = "block-batch-size", env = "BLOB_INDEXER_BLOCK_BATCH_SIZE", default_value = "50")]
    pub block_batch_size: u64,

    /// Delay between retry attempts (e.g., "12s").
    #[arg(
        long = "backoff-retry-interval",
        env = "BLOB_INDEXER_BACKOFF_RETRY_INTERVAL",
        default_value = "12s",
        value_parser = parse_duration
    )]
    pub backoff_retry_interval: Duration,

    /// Maximum number of retries after the initial attempt.
    #[arg(long = "backoff-max-retries", env = "BLOB_INDEXER_BACKOFF_MAX_RETRIES", default_value = "5")]
    pub backoff_max_retries: usize,

    /// Timeout for L1 RPC and beacon HTTP requests (e.g., "30s").
    #[arg(
        long = "rpc-timeout",
        env = "BLOB_INDEXER_RPC_TIMEOUT",
        default_value = "30s",
        value_parser = parse_duration
    )]
    pub rpc_timeout: Duration,

    /// Expose a Prometheus metrics endpoint.
    #[arg(long = "metrics", env = "BLOB_INDEXER_METRICS", default_value = "false")]
    pub metrics: bool,

    /// Metrics server bind address.
    #[arg(long = "metrics-addr", env = "BLOB_INDEXER_METRICS_ADDR", default_value = "127.0.0.1")]
    pub metrics_addr: IpAddr,

    /// Metrics server bind port.
    #[arg(long = "metrics-port", env = "BLOB_INDEXER_METRICS_PORT", default_value = "9090")]
    pub metrics_port: u16,

    /// Log level filter (e.g., "info", "blob_indexer=debug").
    #[arg(long = "log-level", env = "BLOB_INDEXER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Format for logs, can be json or text.
    #[arg(long = "log-format", env = "BLOB_INDEXER_LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Cli {
    /// Converts the parsed arguments into a validated [`Config`].
    pub fn into_config(self) -> Result<Config> {
        let config = Config {
            l1_rpc: self.l1_rpc,
            beacon_url: self.beacon_url,
            inbox_address: self.inbox_address,
            database_url: self.database_url,
            database_max_connections: self.database_max_connections,
            rpc_timeout: self.rpc_timeout,
            indexer: IndexerConfig {
                poll_interval: self.poll_interval,
                block_batch_size: self.block_batch_size,
                start_block: self.start_block,
                retry: RetryConfig {
                    max_retries: self.backoff_max_retries,
                    backoff_interval: self.backoff_retry_interval,
                },
            },
            metrics: MetricsConfig {
                enabled: self.metrics,
                addr: self.metrics_addr,
                port: self.metrics_port,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

/// Parse a duration string like "10s" or "1m".
fn parse_duration(s: &str) -> std::result::Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// Parse a URL string.
fn parse_url(s: &str) -> std::result::Result<Url, url::ParseError> {
    Url::parse(s)
}

/// Parse a 0x-prefixed contract address.
fn parse_address(s: &str) -> std::result::Result<Address, String> {
    s.parse::<Address>().map_err(|e| format!("invalid address '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "blob-indexer",
            "--l1-rpc",
            "http://localhost:8545",
            "--beacon-url",
            "http://localhost:5052",
            "--inbox-address",
            "0x0000000000000000000000000000000000000001",
        ]
    }

    #[test]
    fn defaults_produce_a_valid_config() {
        let cli = Cli::try_parse_from(base_args()).unwrap();
        let config = cli.into_config().unwrap();

        assert_eq!(config.indexer.poll_interval, Duration::from_secs(10));
        assert_eq!(config.indexer.block_batch_size, 50);
        assert_eq!(config.indexer.retry.max_retries, 5);
        assert_eq!(config.indexer.retry.backoff_interval, Duration::from_secs(12));
        assert!(config.indexer.start_block.is_none());
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn durations_accept_humantime_syntax() {
        let mut args = base_args();
        args.extend(["--poll-interval", "1m", "--rpc-timeout", "500ms"]);
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.poll_interval, Duration::from_secs(60));
        assert_eq!(cli.rpc_timeout, Duration::from_millis(500));
    }

    #[test]
    fn zero_batch_size_is_rejected_at_validation() {
        let mut args = base_args();
        args.extend(["--block-batch-size", "0"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.into_config().is_err());
    }
}
