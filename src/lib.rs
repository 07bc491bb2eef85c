#![doc = include_str!("../README.md")]

mod beacon;
pub use beacon::{BeaconApi, BeaconClient, BlobSidecar};

mod blob;
pub use blob::match_sidecar;

mod cli;
pub use cli::Cli;

mod config;
pub use config::{
    Config, IndexerConfig, MetricsConfig, RetryConfig, DEFAULT_BACKOFF_MAX_RETRIES,
    DEFAULT_BACKOFF_RETRY_INTERVAL, DEFAULT_BLOCK_BATCH_SIZE, DEFAULT_POLL_INTERVAL,
};

mod contracts;
pub use contracts::{BatchProposedEvent, EventSource, InboxContractClient};

mod error;
pub use error::{IndexerError, Result};

mod indexer;
pub use indexer::Indexer;

mod metrics;
pub use metrics::IndexerMetrics;

mod retry;
pub use retry::with_retry;

pub mod service;

mod slot_clock;
pub use slot_clock::SlotClock;

mod storage;
pub use storage::{BlobRecord, BlobStore, BlockMetaRecord, PostgresStore};

#[cfg(test)]
mod test_utils;
