//! # Chunk Codec
//!
//! Versioned binary serialization for chunk payloads. The layout is a
//! two-byte header followed by the raw storage arrays:
//!
//! ```text
//! [version: u8][flags: u8][blocks: 32768][sunlight: 16384][blocklight: 16384]
//! ```
//!
//! Flag bit 0 records whether the chunk's light field was stale at save
//! time, so a reload resumes light propagation instead of trusting the
//! serialized values. Unknown versions and short payloads are rejected
//! rather than silently reinterpreted.

use std::error::Error;
use std::fmt;

use cgmath::Point2;

use super::nibble_array::NibbleArray;
use super::{Chunk, CHUNK_VOLUME};

/// Current serialization format version.
pub const CODEC_VERSION: u8 = 1;

const FLAG_LIGHT_DIRTY: u8 = 1 << 0;

const HEADER_LEN: usize = 2;
const LIGHT_LEN: usize = CHUNK_VOLUME.div_ceil(2);
const PAYLOAD_LEN: usize = HEADER_LEN + CHUNK_VOLUME + 2 * LIGHT_LEN;

/// Errors produced while decoding a serialized chunk.
#[derive(Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The payload declares a format version this build does not know.
    UnsupportedVersion(u8),
    /// The payload is not the expected size for its version.
    Truncated { expected: usize, actual: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnsupportedVersion(v) => {
                write!(f, "unsupported chunk format version {v}")
            }
            CodecError::Truncated { expected, actual } => {
                write!(f, "chunk payload is {actual} bytes, expected {expected}")
            }
        }
    }
}

impl Error for CodecError {}

/// Serializes a chunk's persistent state.
pub fn encode(chunk: &Chunk) -> Vec<u8> {
    let mut out = Vec::with_capacity(PAYLOAD_LEN);
    out.push(CODEC_VERSION);

    let mut flags = 0u8;
    if chunk.is_light_dirty() {
        flags |= FLAG_LIGHT_DIRTY;
    }
    out.push(flags);

    out.extend_from_slice(&chunk.blocks);
    out.extend_from_slice(chunk.sunlight.raw_bytes());
    out.extend_from_slice(chunk.blocklight.raw_bytes());
    out
}

/// Rebuilds a chunk from its serialized payload.
///
/// The position is not part of the payload; it is recovered from the save
/// path by the caller. Decoded chunks come back dirty (their mesh does not
/// exist yet) and uncached (the cache publishes them after insertion), but
/// not fresh, so terrain generation is skipped on their next update.
pub fn decode(position: Point2<i32>, bytes: &[u8]) -> Result<Chunk, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Truncated {
            expected: PAYLOAD_LEN,
            actual: 0,
        });
    }
    let version = bytes[0];
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    if bytes.len() != PAYLOAD_LEN {
        return Err(CodecError::Truncated {
            expected: PAYLOAD_LEN,
            actual: bytes.len(),
        });
    }

    let flags = bytes[1];
    let blocks_end = HEADER_LEN + CHUNK_VOLUME;
    let sun_end = blocks_end + LIGHT_LEN;

    let mut chunk = Chunk::new(position);
    chunk.blocks = bytes[HEADER_LEN..blocks_end].to_vec();
    // Lengths were validated above, so the nibble rebuilds cannot fail.
    chunk.sunlight = NibbleArray::from_raw_bytes(CHUNK_VOLUME, &bytes[blocks_end..sun_end])
        .ok_or(CodecError::Truncated {
            expected: PAYLOAD_LEN,
            actual: bytes.len(),
        })?;
    chunk.blocklight = NibbleArray::from_raw_bytes(CHUNK_VOLUME, &bytes[sun_end..])
        .ok_or(CodecError::Truncated {
            expected: PAYLOAD_LEN,
            actual: bytes.len(),
        })?;

    chunk.set_fresh(false);
    chunk.set_dirty(true);
    chunk.set_light_dirty(flags & FLAG_LIGHT_DIRTY != 0);
    Ok(chunk)
}
