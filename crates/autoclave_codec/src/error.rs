//! Error types for the codec crate.

use std::io;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while splitting or decoding LZ4 frames.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The frame does not start with a known magic number.
    #[error("bad frame magic: {found:#010x}")]
    BadMagic {
        /// The magic number that was read.
        found: u32,
    },

    /// The frame descriptor declares an unknown format version.
    #[error("unsupported frame version {version}")]
    UnsupportedVersion {
        /// Version bits from the FLG byte.
        version: u8,
    },

    /// A reserved descriptor bit is set.
    #[error("reserved bits set in {field} byte: {value:#04x}")]
    ReservedBits {
        /// Descriptor byte name (`FLG` or `BD`).
        field: &'static str,
        /// The raw byte.
        value: u8,
    },

    /// The BD byte declares an unknown block maximum size.
    #[error("unsupported block size code {code}")]
    UnsupportedBlockSize {
        /// Block maximum size code.
        code: u8,
    },

    /// A block is larger than the frame allows.
    #[error("block of {size} bytes exceeds frame maximum {max}")]
    BlockTooLarge {
        /// Declared block size.
        size: usize,
        /// Maximum block size from the descriptor.
        max: usize,
    },

    /// A frame is larger than the configured buffer limit.
    #[error("frame of at least {size} bytes exceeds limit {max}")]
    FrameTooLarge {
        /// Frame size seen so far.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// The byte source ended in the middle of a frame.
    #[error("truncated frame: {buffered} bytes buffered at end of input")]
    Truncated {
        /// Bytes left over.
        buffered: usize,
    },

    /// The frame content failed to decode (checksums, malformed sequences).
    #[error("corrupt frame: {message}")]
    Corrupt {
        /// Description from the decoder.
        message: String,
    },

    /// The underlying byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Creates a corrupt frame error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Returns true if the error came from the byte source rather than
    /// from the frame data.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
