//! Error taxonomy for the indexer.

use alloy_primitives::B256;
use alloy_transport::TransportError;
use thiserror::Error;

/// Main error type for the indexer.
///
/// Variants are grouped by retry policy: transport-level failures are
/// transient and retried, precondition violations and not-found conditions
/// surface immediately.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Transport error talking to the L1 RPC node.
    #[error("L1 RPC error: {0}")]
    Rpc(String),

    /// HTTP error talking to the beacon REST API.
    #[error("beacon fetch error: {0}")]
    Beacon(String),

    /// Database error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The event's block timestamp precedes the beacon genesis.
    #[error("timestamp {timestamp} precedes beacon genesis time {genesis_time}")]
    InvalidTimestamp {
        /// The offending L1 block timestamp.
        timestamp: u64,
        /// The beacon chain genesis time.
        genesis_time: u64,
    },

    /// No sidecar in the slot matches the event's versioned hash.
    #[error("no blob sidecar matches versioned hash {0}")]
    BlobNotFound(B256),

    /// A well-formed request produced a response we cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Shutdown marker. Never surfaced to callers; the retry wrapper maps
    /// it to a clean exit.
    #[error("operation cancelled by shutdown")]
    Cancelled,

    /// Configuration validation error.
    #[error("invalid config: {0}")]
    Config(String),

    /// Internal error (task join failures and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

impl IndexerError {
    /// Returns true if this error is transient and the operation should be
    /// retried.
    ///
    /// Only transport-level failures (RPC, beacon HTTP, database) qualify.
    /// `BlobNotFound` stays terminal: if none of a slot's sidecars match,
    /// none ever will.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Beacon(_) | Self::Storage(_))
    }
}

impl From<TransportError> for IndexerError {
    fn from(err: TransportError) -> Self {
        Self::Rpc(err.to_string())
    }
}

impl From<reqwest::Error> for IndexerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Beacon(err.to_string())
    }
}

impl From<sqlx::Error> for IndexerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for indexer operations.
pub type Result<T> = std::result::Result<T, IndexerError>;
