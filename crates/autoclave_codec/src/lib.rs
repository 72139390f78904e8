//! # Autoclave Codec
//!
//! LZ4 frame decoding for autoclaved archive files.
//!
//! Archive files are sequences of independent LZ4 frames. A byte range that
//! starts on a frame boundary can be decompressed without the rest of the
//! file, which is what makes random access into the archives possible.
//!
//! This crate provides:
//! - [`Lz4FrameCodec`] - a [`tokio_util::codec::Decoder`] that turns a byte
//!   source into one decompressed chunk per frame
//! - [`decompress_frames`] / [`frame_index`] - helpers for buffers already
//!   in memory
//! - [`FrameDescriptor`] - frame header parsing
//!
//! ## Example
//!
//! ```rust
//! use std::io::Write;
//!
//! let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
//! encoder.write_all(b"{\"a\":1}\n").unwrap();
//! let compressed = encoder.finish().unwrap();
//!
//! let data = autoclave_codec::decompress_frames(&compressed).unwrap();
//! assert_eq!(&data[..], b"{\"a\":1}\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod codec;
mod error;
mod frame;

pub use buffer::{decompress_frames, frame_index, FrameInfo};
pub use codec::{Lz4FrameCodec, DEFAULT_MAX_FRAME_SIZE};
pub use error::{CodecError, CodecResult};
pub use frame::{is_skippable, FrameDescriptor, LZ4_FRAME_MAGIC, SKIPPABLE_MAGIC};
