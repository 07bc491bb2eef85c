//! Persistence gateway.
//!
//! The indexer owns two tables: `blob_hashes` holds each unique blob exactly
//! once, `blocks_meta` records every batch that referenced one. All writes go
//! through the two transactions exposed here so a reorg or a crash can never
//! leave a partial insert behind.

mod postgres;

pub use postgres::PostgresStore;

use async_trait::async_trait;

use crate::error::Result;

/// A stored blob, keyed by its versioned hash.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BlobRecord {
    /// The EIP-4844 versioned hash, 0x-prefixed hex.
    pub blob_hash: String,
    /// The 48-byte KZG commitment, 0x-prefixed hex.
    pub kzg_commitment: String,
    /// The blob payload, 0x-prefixed hex.
    pub blob_data: String,
}

/// Per-event metadata linking a batch to its blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMetaRecord {
    /// The versioned hash of the referenced blob.
    pub blob_hash: String,
    /// The rollup-side batch identifier.
    pub batch_id: u64,
    /// The L1 block the `BatchProposed` event was emitted in.
    pub emitted_block_id: u64,
}

/// Transactional access to the blob archive.
///
/// Kept behind a trait so the scan loop can be exercised against an
/// in-memory store in tests.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Atomically stores a blob and its metadata.
    ///
    /// The blob row is only inserted if `blob_hash` is not already present,
    /// so multiple batches referencing the same blob store its bytes once.
    /// Re-saving the same `(blob_hash, batch_id)` pair is a no-op, which
    /// makes window re-processing after a partial failure idempotent.
    async fn save_blob_with_meta(&self, blob: BlobRecord, meta: BlockMetaRecord) -> Result<()>;

    /// Atomically deletes all metadata with `emitted_block_id >= block_id`,
    /// then every blob no longer referenced by any metadata row.
    ///
    /// Used by reorg cleanup to discard data from a replayed block range.
    async fn delete_from_block(&self, block_id: u64) -> Result<()>;

    /// Returns the highest `emitted_block_id` across all metadata rows, or 0
    /// when the table is empty ("uninitialized").
    async fn latest_emitted_block(&self) -> Result<u64>;

    /// Looks up a stored blob by its versioned hash.
    ///
    /// This is the read path the external query server is built on.
    async fn find_blob_by_hash(&self, blob_hash: &str) -> Result<Option<BlobRecord>>;
}
