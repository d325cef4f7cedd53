//! Binary persistence format for status snapshots.
//!
//! Layout, in order:
//!
//! ```text
//! magic      4 bytes  b"PMRK"
//! version    2 bytes  u16 little-endian
//! flags      1 byte   bit 0: BLAKE3 checksum present
//! [checksum 32 bytes  BLAKE3 of the payload, if flagged]
//! payload    postcard encoding of the snapshot
//! ```
//!
//! Equal snapshots encode to identical bytes (per AGENTS.md Section 2),
//! so stored history entries can be compared without decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::StatusSnapshot;

/// Magic bytes identifying a canonical snapshot archive.
pub const MAGIC: [u8; 4] = *b"PMRK";

/// Current canonical format version.
pub const FORMAT_VERSION: u16 = 1;

const FLAG_CHECKSUM: u8 = 0b0000_0001;
const HEADER_LEN: usize = 7;
const CHECKSUM_LEN: usize = 32;

/// Failures encoding or decoding the canonical format.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Input shorter than the fixed header.
    #[error("archive truncated ({0} bytes)")]
    Truncated(usize),

    /// Magic bytes did not match.
    #[error("bad archive magic {0:?}")]
    BadMagic([u8; 4]),

    /// Version from a newer (or corrupt) writer.
    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u16),

    /// Payload hash did not match the stored checksum.
    #[error("archive checksum mismatch")]
    ChecksumMismatch,

    /// Archive carries a checksum but this build cannot verify it.
    #[error("archive has a checksum but the crypto-hash feature is disabled")]
    ChecksumUnsupported,

    /// Postcard (de)serialization failed.
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),
}

/// Wire form of the snapshot payload.
///
/// Kept separate from [`StatusSnapshot`] so the stored layout is pinned
/// even if in-memory conveniences change.
#[derive(Serialize, Deserialize)]
struct ArchivedSnapshot {
    snapshot: StatusSnapshot,
}

/// Encode a snapshot into canonical bytes.
pub fn encode_canonical(snapshot: &StatusSnapshot) -> Result<Vec<u8>, FormatError> {
    let payload = postcard::to_allocvec(&ArchivedSnapshot {
        snapshot: snapshot.clone(),
    })?;

    let mut out = Vec::with_capacity(HEADER_LEN + CHECKSUM_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());

    #[cfg(feature = "crypto-hash")]
    {
        out.push(FLAG_CHECKSUM);
        out.extend_from_slice(blake3::hash(&payload).as_bytes());
    }
    #[cfg(not(feature = "crypto-hash"))]
    {
        out.push(0);
    }

    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode canonical bytes back into a snapshot.
pub fn decode_canonical(bytes: &[u8]) -> Result<StatusSnapshot, FormatError> {
    if bytes.len() < HEADER_LEN {
        return Err(FormatError::Truncated(bytes.len()));
    }

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    if magic != MAGIC {
        return Err(FormatError::BadMagic(magic));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }

    let flags = bytes[6];
    let has_checksum = flags & FLAG_CHECKSUM != 0;
    let payload_start = if has_checksum {
        HEADER_LEN + CHECKSUM_LEN
    } else {
        HEADER_LEN
    };
    if bytes.len() < payload_start {
        return Err(FormatError::Truncated(bytes.len()));
    }
    let payload = &bytes[payload_start..];

    if has_checksum {
        #[cfg(feature = "crypto-hash")]
        {
            let stored = &bytes[HEADER_LEN..payload_start];
            if blake3::hash(payload).as_bytes().as_slice() != stored {
                return Err(FormatError::ChecksumMismatch);
            }
        }
        #[cfg(not(feature = "crypto-hash"))]
        return Err(FormatError::ChecksumUnsupported);
    }

    let archived: ArchivedSnapshot = postcard::from_bytes(payload)?;
    Ok(archived.snapshot)
}

// =============================================================================
// TESTS
// =============================================================================
