//! Shared test utilities: mock stubs for the L1 event source and beacon API,
//! plus an in-memory blob store with the same transactional semantics as the
//! Postgres implementation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use alloy_eips::eip4844::kzg_to_versioned_hash;
use alloy_primitives::{B256, FixedBytes};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::beacon::{BeaconApi, BlobSidecar};
use crate::contracts::{BatchProposedEvent, EventSource};
use crate::error::{IndexerError, Result};
use crate::storage::{BlobRecord, BlobStore, BlockMetaRecord};

/// Builds a sidecar whose commitment is `[seed; 48]`, together with the
/// versioned hash an event would carry for it.
pub(crate) fn commitment_pair(seed: u8) -> (BlobSidecar, B256) {
    let commitment = FixedBytes::from([seed; 48]);
    let sidecar = BlobSidecar {
        index: 0,
        kzg_commitment: commitment,
        blob: format!("0x{:02x}", seed),
    };
    (sidecar, kzg_to_versioned_hash(commitment.as_slice()))
}

/// Mock L1 event source serving a fixed event set.
pub(crate) struct MockEventSource {
    pub head: u64,
    pub genesis_height: u64,
    events: Vec<BatchProposedEvent>,
}

impl MockEventSource {
    pub(crate) fn new(head: u64, genesis_height: u64, events: Vec<BatchProposedEvent>) -> Self {
        Self { head, genesis_height, events }
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.head)
    }

    async fn filter_batch_proposed(&self, from: u64, to: u64) -> Result<Vec<BatchProposedEvent>> {
        let mut matched: Vec<_> = self
            .events
            .iter()
            .filter(|e| (from..=to).contains(&e.emitted_block_number))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.emitted_block_number);
        Ok(matched)
    }

    async fn genesis_height(&self) -> Result<u64> {
        Ok(self.genesis_height)
    }
}

/// Mock beacon API with per-slot sidecars and a call counter.
#[derive(Default)]
pub(crate) struct MockBeacon {
    sidecars: Mutex<HashMap<u64, Vec<BlobSidecar>>>,
    pub calls: AtomicU64,
}

impl MockBeacon {
    pub(crate) fn with_sidecars(slot: u64, sidecars: Vec<BlobSidecar>) -> Self {
        let beacon = Self::default();
        beacon.insert_sidecars(slot, sidecars);
        beacon
    }

    pub(crate) fn insert_sidecars(&self, slot: u64, sidecars: Vec<BlobSidecar>) {
        self.sidecars.lock().unwrap().insert(slot, sidecars);
    }
}

#[async_trait]
impl BeaconApi for MockBeacon {
    async fn genesis_time(&self) -> Result<u64> {
        Ok(0)
    }

    async fn seconds_per_slot(&self) -> Result<u64> {
        Ok(12)
    }

    async fn blob_sidecars(&self, slot: u64) -> Result<Vec<BlobSidecar>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sidecars.lock().unwrap().get(&slot).cloned().unwrap_or_default())
    }
}

/// In-memory [`BlobStore`] mirroring the Postgres transaction semantics:
/// lookup-before-insert for blobs, unique `(blob_hash, batch_id)` metadata,
/// join-based delete on reorg cleanup.
#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<MemoryInner>,
    pub fail_saves: AtomicBool,
    /// When set, the first save cancels this token and fails with a
    /// transient error, simulating a shutdown arriving mid-retry.
    pub cancel_on_save: Mutex<Option<CancellationToken>>,
}

#[derive(Default)]
struct MemoryInner {
    blobs: HashMap<String, BlobRecord>,
    meta: Vec<BlockMetaRecord>,
}

impl MemoryStore {
    pub(crate) fn blob_count(&self) -> usize {
        self.inner.lock().unwrap().blobs.len()
    }

    pub(crate) fn meta_rows(&self) -> Vec<BlockMetaRecord> {
        let mut rows = self.inner.lock().unwrap().meta.clone();
        rows.sort_by_key(|m| m.emitted_block_id);
        rows
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn save_blob_with_meta(&self, blob: BlobRecord, meta: BlockMetaRecord) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(IndexerError::Storage("injected save failure".into()));
        }

        if let Some(token) = self.cancel_on_save.lock().unwrap().take() {
            token.cancel();
            return Err(IndexerError::Storage("connection reset during shutdown".into()));
        }

        let mut inner = self.inner.lock().unwrap();
        inner.blobs.entry(blob.blob_hash.clone()).or_insert(blob);

        let duplicate = inner
            .meta
            .iter()
            .any(|m| m.blob_hash == meta.blob_hash && m.batch_id == meta.batch_id);
        if !duplicate {
            inner.meta.push(meta);
        }

        Ok(())
    }

    async fn delete_from_block(&self, block_id: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.meta.retain(|m| m.emitted_block_id < block_id);

        let referenced: HashSet<String> =
            inner.meta.iter().map(|m| m.blob_hash.clone()).collect();
        inner.blobs.retain(|hash, _| referenced.contains(hash));

        Ok(())
    }

    async fn latest_emitted_block(&self) -> Result<u64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.meta.iter().map(|m| m.emitted_block_id).max().unwrap_or(0))
    }

    async fn find_blob_by_hash(&self, blob_hash: &str) -> Result<Option<BlobRecord>> {
        Ok(self.inner.lock().unwrap().blobs.get(blob_hash).cloned())
    }
}
