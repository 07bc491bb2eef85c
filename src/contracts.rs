//! Rollup inbox contract bindings and the L1 event source.
//!
//! The indexer only needs two things from the contract: the `BatchProposed`
//! event stream and the chain's genesis height, so the `sol!` interface stays
//! deliberately narrow instead of carrying full generated bindings.

use std::time::Duration;

use alloy_primitives::{Address, B256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{Filter, Log};
use alloy_sol_types::{sol, SolEvent};
use alloy_transport_http::{reqwest::Client, Http};
use async_trait::async_trait;
use url::Url;

use crate::error::{IndexerError, Result};

sol! {
    /// Rollup inbox contract interface.
    #[sol(rpc)]
    interface IRollupInbox {
        /// Emitted for every proposed batch. Carries the versioned hash of
        /// the batch's blob, not the blob itself.
        event BatchProposed(uint256 indexed batchId, bytes32 blobHash, bool blobUsed, uint64 timestamp);

        /// Returns the L1 block height the rollup was deployed at.
        function genesisHeight() external view returns (uint64);
    }
}

/// A decoded `BatchProposed` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProposedEvent {
    /// The L1 block the event was emitted in.
    pub emitted_block_number: u64,
    /// The rollup-side batch identifier.
    pub batch_id: u64,
    /// The EIP-4844 versioned hash of the batch's blob.
    pub blob_hash: B256,
    /// False when the batch was posted as calldata instead of a blob.
    pub blob_used: bool,
    /// Timestamp of the L1 block the batch was anchored to, unix seconds.
    pub timestamp: u64,
}

/// Read access to the L1 chain and the inbox contract, substitutable in
/// tests.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Returns the current chain head block number.
    async fn block_number(&self) -> Result<u64>;

    /// Returns all `BatchProposed` events emitted in `[from, to]`, in
    /// ascending block order.
    async fn filter_batch_proposed(&self, from: u64, to: u64) -> Result<Vec<BatchProposedEvent>>;

    /// Returns the rollup's genesis height on L1.
    async fn genesis_height(&self) -> Result<u64>;
}

/// [`EventSource`] implementation backed by Alloy's sol-generated bindings.
#[derive(Debug)]
pub struct InboxContractClient {
    address: Address,
    provider: RootProvider,
    contract: IRollupInbox::IRollupInboxInstance<RootProvider>,
}

impl InboxContractClient {
    /// Creates a new client for the given inbox address and L1 RPC URL.
    pub fn new(l1_rpc_url: Url, address: Address, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build L1 HTTP client: {e}")))?;

        let http = Http::with_client(client, l1_rpc_url);
        let rpc_client = RpcClient::new(http, false);
        let provider = RootProvider::new(rpc_client);
        let contract = IRollupInbox::IRollupInboxInstance::new(address, provider.clone());

        Ok(Self { address, provider, contract })
    }
}

#[async_trait]
impl EventSource for InboxContractClient {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn filter_batch_proposed(&self, from: u64, to: u64) -> Result<Vec<BatchProposedEvent>> {
        let filter = Filter::new()
            .address(self.address)
            .event_signature(IRollupInbox::BatchProposed::SIGNATURE_HASH)
            .from_block(from)
            .to_block(to);

        let logs = self.provider.get_logs(&filter).await?;

        logs.iter().map(decode_batch_proposed).collect()
    }

    async fn genesis_height(&self) -> Result<u64> {
        self.contract
            .genesisHeight()
            .call()
            .await
            .map_err(|e| IndexerError::Rpc(format!("genesisHeight call failed: {e}")))
    }
}

/// Decodes one `BatchProposed` log into its domain event.
fn decode_batch_proposed(log: &Log) -> Result<BatchProposedEvent> {
    let decoded = log.log_decode::<IRollupInbox::BatchProposed>().map_err(|err| {
        IndexerError::InvalidResponse(format!("undecodable BatchProposed log: {err}"))
    })?;

    let emitted_block_number = log
        .block_number
        .ok_or_else(|| IndexerError::InvalidResponse("log is missing a block number".into()))?;

    let event = decoded.inner.data;
    let batch_id = u64::try_from(event.batchId).map_err(|_| {
        IndexerError::InvalidResponse(format!("batch id {} overflows u64", event.batchId))
    })?;

    Ok(BatchProposedEvent {
        emitted_block_number,
        batch_id,
        blob_hash: event.blobHash,
        blob_used: event.blobUsed,
        timestamp: event.timestamp,
    })
}
