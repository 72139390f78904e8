//! Whole-buffer helpers.

use crate::codec::Lz4FrameCodec;
use crate::error::CodecResult;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Position and sizes of one frame inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Offset of the frame's first byte.
    pub offset: u64,
    /// Compressed size, header and trailer included.
    pub compressed_len: u64,
    /// Size of the decompressed content.
    pub decompressed_len: u64,
}

/// Decompresses a buffer holding one or more complete frames.
///
/// The output is the concatenation of every frame's content. An empty
/// buffer decompresses to an empty output.
///
/// # Errors
///
/// Returns an error if a frame is malformed, fails its checksums, or the
/// buffer ends inside a frame.
pub fn decompress_frames(data: &[u8]) -> CodecResult<Bytes> {
    let mut codec = Lz4FrameCodec::with_max_frame_size(usize::MAX);
    let mut src = BytesMut::from(data);
    let mut out = BytesMut::new();
    while let Some(chunk) = codec.decode_eof(&mut src)? {
        out.extend_from_slice(&chunk);
    }
    Ok(out.freeze())
}

/// Lists the frames in a buffer with their compressed and decompressed sizes.
///
/// # Errors
///
/// Same as [`decompress_frames`].
pub fn frame_index(data: &[u8]) -> CodecResult<Vec<FrameInfo>> {
    let mut codec = Lz4FrameCodec::with_max_frame_size(usize::MAX);
    let mut src = BytesMut::from(data);
    let mut frames = Vec::new();
    let mut offset = 0u64;

    loop {
        let before = src.len();
        let Some(chunk) = codec.decode_eof(&mut src)? else {
            break;
        };
        let compressed_len = (before - src.len()) as u64;
        frames.push(FrameInfo {
            offset,
            compressed_len,
            decompressed_len: chunk.len() as u64,
        });
        offset += compressed_len;
    }
    Ok(frames)
}
