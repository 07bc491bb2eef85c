//! Event scan loop.
//!
//! The indexer polls the L1 chain on a fixed interval, paginates the
//! unscanned block range into bounded windows, and drives reorg detection
//! plus per-event blob archival to completion before advancing its watermark.
//! Windows are strictly sequential; events within a window fan out into a
//! fork-join task group and are safe to complete out of order because blob
//! storage is idempotent.

use std::cmp;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::beacon::BeaconApi;
use crate::blob::match_sidecar;
use crate::config::IndexerConfig;
use crate::contracts::{BatchProposedEvent, EventSource};
use crate::error::{IndexerError, Result};
use crate::metrics::IndexerMetrics;
use crate::retry::with_retry;
use crate::slot_clock::SlotClock;
use crate::storage::{BlobRecord, BlobStore, BlockMetaRecord};

/// The main indexer driving the scan loop.
pub struct Indexer<E, B, S>
where
    E: EventSource,
    B: BeaconApi,
    S: BlobStore,
{
    config: IndexerConfig,
    l1: Arc<E>,
    beacon: Arc<B>,
    store: Arc<S>,
    slot_clock: SlotClock,
    cancel: CancellationToken,
    metrics: IndexerMetrics,
    /// The last L1 block whose events have been fully processed. Owned and
    /// mutated exclusively by the scan loop.
    watermark: u64,
}

impl<E, B, S> Indexer<E, B, S>
where
    E: EventSource + 'static,
    B: BeaconApi + 'static,
    S: BlobStore + 'static,
{
    /// Creates a new indexer with the given collaborators.
    pub fn new(
        config: IndexerConfig,
        l1: Arc<E>,
        beacon: Arc<B>,
        store: Arc<S>,
        slot_clock: SlotClock,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            l1,
            beacon,
            store,
            slot_clock,
            cancel,
            metrics: IndexerMetrics::default(),
            watermark: 0,
        }
    }

    /// Runs the scan loop until the cancellation token fires.
    pub async fn run(mut self) -> Result<()> {
        self.watermark = self.initial_watermark().await?;
        info!(watermark = self.watermark, poll_interval = ?self.config.poll_interval, "starting event scan loop");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("event scan loop received shutdown signal");
                    break;
                }
                () = sleep(self.config.poll_interval) => {
                    if let Err(err) = self.scan().await {
                        self.metrics.scan_errors.increment(1);
                        error!(error = %err, watermark = self.watermark, "scan pass failed");
                    }
                }
            }
        }

        info!("event scan loop stopped");
        Ok(())
    }

    /// Resolves the resume point: the store's highest emitted block, else the
    /// configured start override, else the contract's genesis height.
    async fn initial_watermark(&self) -> Result<u64> {
        let stored = self.store.latest_emitted_block().await?;
        if stored != 0 {
            return Ok(stored);
        }

        if let Some(start) = self.config.start_block {
            return Ok(start.saturating_sub(1));
        }

        Ok(self.l1.genesis_height().await?.saturating_sub(1))
    }

    /// One scan pass: walks every window between the watermark and the chain
    /// head, advancing the watermark after each fully-processed window.
    async fn scan(&mut self) -> Result<()> {
        let head = self.l1.block_number().await?;
        if head <= self.watermark {
            debug!(head, watermark = self.watermark, "no new blocks");
            return Ok(());
        }

        info!(
            from = self.watermark + 1,
            to = head,
            batch_size = self.config.block_batch_size,
            "scanning for batch proposed events"
        );

        let mut start = self.watermark + 1;
        while start <= head {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let end = cmp::min(start + self.config.block_batch_size, head);
            self.scan_window(start, end).await?;

            // A window interrupted by shutdown resolves cleanly without its
            // events having been processed; the watermark must not move past
            // it. The next startup resumes from the store.
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            self.watermark = end;
            start = end + 1;
        }

        Ok(())
    }

    /// Fetches one window's events, runs reorg detection against the first,
    /// and processes every event in a fork-join task group. Returns an error
    /// (without the caller advancing the watermark) if any event fails with a
    /// non-cancellation error.
    async fn scan_window(&self, start: u64, end: u64) -> Result<()> {
        debug!(start, end, "scanning window");
        let events = self.l1.filter_batch_proposed(start, end).await?;

        if let Some(first) = events.first() {
            self.check_reorg(first).await?;
        }

        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        for event in events {
            let beacon = Arc::clone(&self.beacon);
            let store = Arc::clone(&self.store);
            let slot_clock = self.slot_clock;
            let cancel = self.cancel.clone();
            let retry = self.config.retry.clone();
            let metrics = self.metrics.clone();

            tasks.spawn(async move {
                with_retry("store blob", &cancel, &retry, || {
                    store_blob(&*beacon, &slot_clock, &*store, &metrics, &event)
                })
                .await?;

                metrics.events_indexed.increment(1);
                Ok(())
            });
        }

        // Fork-join: wait for every task before deciding the window's fate,
        // so the watermark can never skip ahead of unprocessed events.
        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| IndexerError::Internal(format!("event task panicked: {e}")))
                .and_then(|r| r);

            if let Err(err) = result {
                error!(error = %err, start, end, "event processing failed");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Declares a reorg when the chain replays a block range already indexed,
    /// and purges the stale rows before the range is re-processed.
    ///
    /// Checked once per window, against the window's first event. A reorg
    /// that begins strictly inside a window is caught on the next pass, when
    /// the re-fetched window's first event lands at or below the watermark.
    async fn check_reorg(&self, event: &BatchProposedEvent) -> Result<()> {
        let stored = self.store.latest_emitted_block().await?;

        if stored >= event.emitted_block_number {
            warn!(
                stored_latest = stored,
                event_emitted_in = event.emitted_block_number,
                "reorg detected, purging replayed range"
            );
            self.metrics.reorgs_detected.increment(1);
            self.store.delete_from_block(event.emitted_block_number).await?;
        }

        Ok(())
    }
}

/// Processes a single event: converts its timestamp to a slot, fetches the
/// slot's sidecars, matches the event's versioned hash, and persists the
/// (blob, metadata) pair.
async fn store_blob<B, S>(
    beacon: &B,
    slot_clock: &SlotClock,
    store: &S,
    metrics: &IndexerMetrics,
    event: &BatchProposedEvent,
) -> Result<()>
where
    B: BeaconApi,
    S: BlobStore,
{
    debug!(
        batch_id = event.batch_id,
        emitted_in = event.emitted_block_number,
        blob_used = event.blob_used,
        "batch proposed event found"
    );

    if !event.blob_used {
        return Ok(());
    }

    let started = Instant::now();

    let slot = slot_clock.slot_at(event.timestamp)?;
    let sidecars = beacon.blob_sidecars(slot).await?;
    let sidecar = match_sidecar(&sidecars, event.blob_hash)
        .ok_or(IndexerError::BlobNotFound(event.blob_hash))?;

    let blob_hash = event.blob_hash.to_string();
    store
        .save_blob_with_meta(
            BlobRecord {
                blob_hash: blob_hash.clone(),
                kzg_commitment: sidecar.kzg_commitment.to_string(),
                blob_data: sidecar.blob.clone(),
            },
            BlockMetaRecord {
                blob_hash,
                batch_id: event.batch_id,
                emitted_block_id: event.emitted_block_number,
            },
        )
        .await?;

    metrics.store_blob_duration.record(started.elapsed().as_secs_f64());
    metrics.blobs_stored.increment(1);
    info!(
        blob_hash = %event.blob_hash,
        slot,
        batch_id = event.batch_id,
        "blob archived"
    );

    Ok(())
}
