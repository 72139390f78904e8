//! LZ4 frame descriptor parsing and single-frame decoding.
//!
//! Layout of a frame:
//!
//! ```text
//! | magic (4) | FLG (1) | BD (1) | content size (0/8) | dict id (0/4) | HC (1) |
//! | block size (4) | block data | block checksum (0/4) | ... repeated
//! | end mark (4, zero) | content checksum (0/4) |
//! ```
//!
//! All integers are little-endian.

use crate::error::{CodecError, CodecResult};
use bytes::Bytes;
use std::io::Read;

/// Magic number of a standard LZ4 frame.
pub const LZ4_FRAME_MAGIC: u32 = 0x184D_2204;

/// First magic number of the skippable frame range.
pub const SKIPPABLE_MAGIC: u32 = 0x184D_2A50;

/// Mask selecting the fixed part of skippable magic numbers.
pub const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;

/// Size of a block size word, end mark, or checksum.
pub(crate) const WORD: usize = 4;

/// Bit marking a block stored without compression.
const UNCOMPRESSED_BIT: u32 = 0x8000_0000;

/// Minimum bytes needed before the descriptor length is known.
const DESCRIPTOR_PREFIX: usize = 6;

/// Reads a little-endian `u32` at `pos`. Caller checks bounds.
pub(crate) fn read_u32(src: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([src[pos], src[pos + 1], src[pos + 2], src[pos + 3]])
}

/// Returns true if `magic` belongs to a skippable frame.
#[must_use]
pub const fn is_skippable(magic: u32) -> bool {
    magic & SKIPPABLE_MAGIC_MASK == SKIPPABLE_MAGIC
}

/// Parsed frame descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Blocks do not reference previous blocks.
    pub block_independent: bool,
    /// Each block is followed by a checksum.
    pub block_checksum: bool,
    /// Declared decompressed size, if present.
    pub content_size: Option<u64>,
    /// The frame ends with a content checksum.
    pub content_checksum: bool,
    /// Dictionary identifier, if present.
    pub dictionary_id: Option<u32>,
    /// Maximum size of a single block.
    pub block_max_size: usize,
    /// Header length including the magic number and header checksum.
    pub header_len: usize,
}

impl FrameDescriptor {
    /// Parses the header of a frame starting at `src[0]` (magic included).
    ///
    /// Returns `Ok(None)` if more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the magic number or descriptor bits are invalid.
    pub fn parse(src: &[u8]) -> CodecResult<Option<Self>> {
        if src.len() < WORD {
            return Ok(None);
        }
        let magic = read_u32(src, 0);
        if magic != LZ4_FRAME_MAGIC {
            return Err(CodecError::BadMagic { found: magic });
        }
        if src.len() < DESCRIPTOR_PREFIX {
            return Ok(None);
        }

        let flg = src[4];
        let bd = src[5];

        let version = flg >> 6;
        if version != 1 {
            return Err(CodecError::UnsupportedVersion { version });
        }
        if flg & 0x02 != 0 {
            return Err(CodecError::ReservedBits {
                field: "FLG",
                value: flg,
            });
        }
        if bd & 0x8F != 0 {
            return Err(CodecError::ReservedBits {
                field: "BD",
                value: bd,
            });
        }

        let block_max_size = match (bd >> 4) & 0x07 {
            4 => 64 * 1024,
            5 => 256 * 1024,
            6 => 1024 * 1024,
            7 => 4 * 1024 * 1024,
            code => return Err(CodecError::UnsupportedBlockSize { code }),
        };

        let has_content_size = flg & 0x08 != 0;
        let has_dictionary_id = flg & 0x01 != 0;
        let header_len = DESCRIPTOR_PREFIX
            + if has_content_size { 8 } else { 0 }
            + if has_dictionary_id { 4 } else { 0 }
            + 1;
        if src.len() < header_len {
            return Ok(None);
        }

        let mut pos = DESCRIPTOR_PREFIX;
        let content_size = if has_content_size {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&src[pos..pos + 8]);
            pos += 8;
            Some(u64::from_le_bytes(raw))
        } else {
            None
        };
        let dictionary_id = if has_dictionary_id {
            Some(read_u32(src, pos))
        } else {
            None
        };

        Ok(Some(Self {
            block_independent: flg & 0x20 != 0,
            block_checksum: flg & 0x10 != 0,
            content_size,
            content_checksum: flg & 0x04 != 0,
            dictionary_id,
            block_max_size,
            header_len,
        }))
    }

    /// Bytes following a block's data (its checksum, if any).
    #[must_use]
    pub const fn block_trailer_len(&self) -> usize {
        if self.block_checksum {
            WORD
        } else {
            0
        }
    }

    /// Bytes following the end mark (the content checksum, if any).
    #[must_use]
    pub const fn frame_trailer_len(&self) -> usize {
        if self.content_checksum {
            WORD
        } else {
            0
        }
    }
}

/// Size of the block announced by a block size word, and whether it is the
/// end mark.
pub(crate) fn block_len(word: u32) -> Option<usize> {
    if word == 0 {
        None
    } else {
        Some((word & !UNCOMPRESSED_BIT) as usize)
    }
}

/// Decodes exactly one complete frame.
///
/// Checksum verification (header, blocks, content) is done by the decoder.
pub(crate) fn decode_frame(frame: &[u8], descriptor: &FrameDescriptor) -> CodecResult<Bytes> {
    let capacity = descriptor
        .content_size
        .and_then(|size| usize::try_from(size).ok())
        .unwrap_or(frame.len() * 4)
        .min(descriptor.block_max_size * 16);

    let mut out = Vec::with_capacity(capacity);
    lz4_flex::frame::FrameDecoder::new(frame)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::corrupt(e.to_string()))?;

    if let Some(expected) = descriptor.content_size {
        if out.len() as u64 != expected {
            return Err(CodecError::corrupt(format!(
                "content size mismatch: header says {expected}, decoded {}",
                out.len()
            )));
        }
    }
    Ok(Bytes::from(out))
}
