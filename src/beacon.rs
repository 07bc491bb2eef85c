//! Beacon REST API client.
//!
//! Fetches chain parameters at startup and blob sidecars per slot. The beacon
//! API encodes numeric fields as decimal strings, so every response goes
//! through an explicit parse step before it reaches the rest of the indexer.

use std::time::Duration;

use alloy_primitives::FixedBytes;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::{IndexerError, Result};

const GENESIS_PATH: &str = "eth/v1/beacon/genesis";
const SPEC_PATH: &str = "eth/v1/config/spec";
const BLOB_SIDECARS_PATH: &str = "eth/v1/beacon/blob_sidecars";

/// A single blob sidecar as returned by the beacon node.
///
/// The blob payload is kept in its 0x-hex wire encoding; the indexer never
/// needs the raw bytes, only the commitment to match against.
#[derive(Debug, Clone)]
pub struct BlobSidecar {
    /// Position of the blob within its slot.
    pub index: u64,
    /// The 48-byte KZG commitment to the blob.
    pub kzg_commitment: FixedBytes<48>,
    /// The blob payload, 0x-prefixed hex.
    pub blob: String,
}

/// Read access to the beacon chain, substitutable in tests.
#[async_trait]
pub trait BeaconApi: Send + Sync {
    /// Returns the chain's genesis time in unix seconds.
    async fn genesis_time(&self) -> Result<u64>;

    /// Returns the configured `SECONDS_PER_SLOT`.
    async fn seconds_per_slot(&self) -> Result<u64>;

    /// Returns all blob sidecars published in the given slot.
    ///
    /// An empty list is a valid response (no blobs in that slot).
    async fn blob_sidecars(&self, slot: u64) -> Result<Vec<BlobSidecar>>;
}

/// HTTP implementation of [`BeaconApi`] against a beacon node's REST API.
#[derive(Debug, Clone)]
pub struct BeaconClient {
    base: String,
    client: Client,
}

impl BeaconClient {
    /// Creates a new client for the given beacon base URL.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build beacon HTTP client: {e}")))?;

        Ok(Self { base: base_url.as_str().trim_end_matches('/').to_string(), client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base)
    }
}

#[async_trait]
impl BeaconApi for BeaconClient {
    async fn genesis_time(&self) -> Result<u64> {
        let response: GenesisResponse = self
            .client
            .get(self.endpoint(GENESIS_PATH))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.data.genesis_time.parse::<u64>().map_err(|err| {
            IndexerError::InvalidResponse(format!(
                "invalid genesis_time '{}' from beacon: {err}",
                response.data.genesis_time
            ))
        })
    }

    async fn seconds_per_slot(&self) -> Result<u64> {
        let response: SpecResponse = self
            .client
            .get(self.endpoint(SPEC_PATH))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.data.seconds_per_slot.parse::<u64>().map_err(|err| {
            IndexerError::InvalidResponse(format!(
                "invalid SECONDS_PER_SLOT '{}' from beacon: {err}",
                response.data.seconds_per_slot
            ))
        })
    }

    async fn blob_sidecars(&self, slot: u64) -> Result<Vec<BlobSidecar>> {
        let url = format!("{}/{slot}", self.endpoint(BLOB_SIDECARS_PATH));
        let response = self.client.get(url).send().await?;

        // Slots without a block 404; that is "no blobs", not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let response: BlobSidecarsResponse = response.error_for_status()?.json().await?;
        parse_sidecars(response, slot)
    }
}

/// Converts the wire-format sidecar list into typed sidecars.
///
/// A malformed entry is reported as a transient beacon failure so the fetch
/// is retried; beacon nodes occasionally serve partial responses mid-sync.
fn parse_sidecars(response: BlobSidecarsResponse, slot: u64) -> Result<Vec<BlobSidecar>> {
    let mut sidecars = Vec::with_capacity(response.data.len());

    for entry in response.data {
        let index = entry.index.parse::<u64>().map_err(|err| {
            IndexerError::Beacon(format!("invalid sidecar index '{}' in slot {slot}: {err}", entry.index))
        })?;

        let kzg_commitment = entry.kzg_commitment.parse::<FixedBytes<48>>().map_err(|err| {
            IndexerError::Beacon(format!("invalid kzg commitment in slot {slot} index {index}: {err}"))
        })?;

        sidecars.push(BlobSidecar { index, kzg_commitment, blob: entry.blob });
    }

    Ok(sidecars)
}

#[derive(Debug, Deserialize)]
struct GenesisResponse {
    data: GenesisData,
}

#[derive(Debug, Deserialize)]
struct GenesisData {
    genesis_time: String,
}

#[derive(Debug, Deserialize)]
struct SpecResponse {
    data: SpecData,
}

#[derive(Debug, Deserialize)]
struct SpecData {
    #[serde(rename = "SECONDS_PER_SLOT")]
    seconds_per_slot: String,
}

#[derive(Debug, Deserialize)]
struct BlobSidecarsResponse {
    data: Vec<BlobSidecarEntry>,
}

#[derive(Debug, Deserialize)]
struct BlobSidecarEntry {
    index: String,
    blob: String,
    kzg_commitment: String,
}
