//! PostgreSQL implementation of the blob store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::{IndexerError, Result};

use super::{BlobRecord, BlobStore, BlockMetaRecord};

/// PostgreSQL-backed [`BlobStore`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects to the database with the given pool size.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!(message = "connected to database");
        Ok(Self { pool })
    }

    /// Creates a store from an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies pending schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        info!(message = "database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for PostgresStore {
    async fn save_blob_with_meta(&self, blob: BlobRecord, meta: BlockMetaRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM blob_hashes WHERE blob_hash = $1",
        )
        .bind(&blob.blob_hash)
        .fetch_optional(&mut *tx)
        .await?;

        if exists.is_none() {
            // ON CONFLICT tolerates a concurrent insert of the same hash
            // between the lookup and the write; either row is identical.
            sqlx::query(
                r#"
                INSERT INTO blob_hashes (blob_hash, kzg_commitment, blob_data)
                VALUES ($1, $2, $3)
                ON CONFLICT (blob_hash) DO NOTHING
                "#,
            )
            .bind(&blob.blob_hash)
            .bind(&blob.kzg_commitment)
            .bind(&blob.blob_data)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO blocks_meta (blob_hash, batch_id, emitted_block_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (blob_hash, batch_id) DO NOTHING
            "#,
        )
        .bind(&meta.blob_hash)
        .bind(meta.batch_id as i64)
        .bind(meta.emitted_block_id as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_from_block(&self, block_id: u64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted_meta = sqlx::query("DELETE FROM blocks_meta WHERE emitted_block_id >= $1")
            .bind(block_id as i64)
            .execute(&mut *tx)
            .await?;

        let deleted_blobs = sqlx::query(
            r#"
            DELETE FROM blob_hashes
            WHERE NOT EXISTS (
                SELECT 1 FROM blocks_meta m WHERE m.blob_hash = blob_hashes.blob_hash
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            from_block = block_id,
            meta_rows = deleted_meta.rows_affected(),
            blob_rows = deleted_blobs.rows_affected(),
            "purged rows at and above block"
        );
        Ok(())
    }

    async fn latest_emitted_block(&self) -> Result<u64> {
        let latest = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(emitted_block_id), 0) FROM blocks_meta",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(latest as u64)
    }

    async fn find_blob_by_hash(&self, blob_hash: &str) -> Result<Option<BlobRecord>> {
        let record = sqlx::query_as::<_, BlobRecord>(
            "SELECT blob_hash, kzg_commitment, blob_data FROM blob_hashes WHERE blob_hash = $1",
        )
        .bind(blob_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
