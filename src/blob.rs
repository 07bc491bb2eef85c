//! Blob matching.
//!
//! Pairs an on-chain event's versioned hash with the sidecar that carries the
//! committed blob, by recomputing each sidecar's versioned hash per EIP-4844
//! (SHA-256 of the 48-byte KZG commitment, first byte replaced with the
//! blob-commitment version byte).

use alloy_eips::eip4844::kzg_to_versioned_hash;
use alloy_primitives::B256;

use crate::beacon::BlobSidecar;

/// Returns the first sidecar whose recomputed versioned hash equals
/// `expected`, or `None` if the slot's sidecars do not contain the blob.
///
/// A missing match is terminal for the event: the blob will never appear in
/// this slot's sidecars if it is not there now.
pub fn match_sidecar<'a>(sidecars: &'a [BlobSidecar], expected: B256) -> Option<&'a BlobSidecar> {
    sidecars
        .iter()
        .find(|sidecar| kzg_to_versioned_hash(sidecar.kzg_commitment.as_slice()) == expected)
}
