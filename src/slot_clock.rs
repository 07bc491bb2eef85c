//! Beacon time/slot arithmetic.

use crate::beacon::BeaconApi;
use crate::error::{IndexerError, Result};

/// Converts L1 block timestamps into beacon-chain slot numbers.
///
/// Genesis time and slot duration are fetched once at startup from the beacon
/// node's `genesis` and `config/spec` endpoints; after that every conversion
/// is pure arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct SlotClock {
    genesis_time: u64,
    seconds_per_slot: u64,
}

impl SlotClock {
    /// Creates a slot clock from known chain parameters.
    pub fn new(genesis_time: u64, seconds_per_slot: u64) -> Result<Self> {
        if seconds_per_slot == 0 {
            return Err(IndexerError::Config("SECONDS_PER_SLOT must be non-zero".into()));
        }
        Ok(Self { genesis_time, seconds_per_slot })
    }

    /// Creates a slot clock by querying the beacon node.
    ///
    /// Fails if either endpoint is unreachable or its response is missing the
    /// expected field; callers treat this as fatal at startup.
    pub async fn from_beacon<B: BeaconApi + ?Sized>(beacon: &B) -> Result<Self> {
        let genesis_time = beacon.genesis_time().await?;
        let seconds_per_slot = beacon.seconds_per_slot().await?;
        Self::new(genesis_time, seconds_per_slot)
    }

    /// Returns the slot containing the given unix timestamp.
    ///
    /// A timestamp before genesis is a hard precondition violation, not a
    /// transient condition; it aborts processing of that single event.
    pub fn slot_at(&self, timestamp: u64) -> Result<u64> {
        if timestamp < self.genesis_time {
            return Err(IndexerError::InvalidTimestamp {
                timestamp,
                genesis_time: self.genesis_time,
            });
        }
        Ok((timestamp - self.genesis_time) / self.seconds_per_slot)
    }
}
