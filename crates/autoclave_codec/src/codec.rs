//! Streaming LZ4 frame decoder.

use crate::error::{CodecError, CodecResult};
use crate::frame::{block_len, decode_frame, is_skippable, read_u32, FrameDescriptor, WORD};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Default limit for a single buffered frame (64 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// A frame whose header has been read but whose end has not been seen yet.
#[derive(Debug, Clone, Copy)]
enum PendingFrame {
    /// Standard frame; `cursor` is the offset of the next block size word.
    Lz4 {
        descriptor: FrameDescriptor,
        cursor: usize,
    },
    /// Skippable frame of `len` bytes, header included.
    Skippable { len: usize },
}

/// Where block scanning stopped.
enum Scan {
    /// More bytes are needed; resume at this offset.
    Incomplete(usize),
    /// The frame ends at this offset.
    Complete(usize),
}

/// Splits a byte source of back-to-back LZ4 frames into decompressed chunks.
///
/// Each item is the decompressed content of exactly one frame. Skippable
/// frames yield an empty chunk so that callers can count frames. A frame is
/// only decoded once all its bytes have arrived, so the buffer never holds
/// more than one frame plus whatever the reader delivered past it.
///
/// Use it with [`tokio_util::codec::FramedRead`] over any `AsyncRead`:
///
/// ```rust,no_run
/// use autoclave_codec::Lz4FrameCodec;
/// use futures::TryStreamExt;
/// use tokio_util::codec::FramedRead;
///
/// # async fn run(reader: impl tokio::io::AsyncRead + Unpin) -> Result<(), autoclave_codec::CodecError> {
/// let mut frames = FramedRead::new(reader, Lz4FrameCodec::new());
/// while let Some(chunk) = frames.try_next().await? {
///     println!("{} decompressed bytes", chunk.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Lz4FrameCodec {
    max_frame_size: usize,
    pending: Option<PendingFrame>,
}

impl Lz4FrameCodec {
    /// Creates a codec with the default frame size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a codec that rejects frames larger than `max_frame_size`
    /// compressed bytes.
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            pending: None,
        }
    }

    /// Returns the frame size limit.
    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Returns true if a frame header has been read but the frame is not
    /// complete.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.pending.is_some()
    }

    fn check_size(&self, size: usize) -> CodecResult<()> {
        if size > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }

    fn start_frame(&self, src: &[u8]) -> CodecResult<Option<PendingFrame>> {
        if src.len() < WORD {
            return Ok(None);
        }
        let magic = read_u32(src, 0);
        if is_skippable(magic) {
            if src.len() < 2 * WORD {
                return Ok(None);
            }
            let len = 2 * WORD + read_u32(src, WORD) as usize;
            self.check_size(len)?;
            return Ok(Some(PendingFrame::Skippable { len }));
        }

        Ok(FrameDescriptor::parse(src)?.map(|descriptor| PendingFrame::Lz4 {
            descriptor,
            cursor: descriptor.header_len,
        }))
    }

    fn scan_blocks(
        &self,
        src: &mut BytesMut,
        descriptor: &FrameDescriptor,
        mut cursor: usize,
    ) -> CodecResult<Scan> {
        loop {
            if src.len() < cursor + WORD {
                src.reserve(cursor + WORD - src.len());
                return Ok(Scan::Incomplete(cursor));
            }

            let next = match block_len(read_u32(src, cursor)) {
                None => cursor + WORD + descriptor.frame_trailer_len(),
                Some(size) => {
                    if size > descriptor.block_max_size {
                        return Err(CodecError::BlockTooLarge {
                            size,
                            max: descriptor.block_max_size,
                        });
                    }
                    cursor + WORD + size + descriptor.block_trailer_len()
                }
            };
            self.check_size(next)?;

            if src.len() < next {
                src.reserve(next - src.len());
                return Ok(Scan::Incomplete(cursor));
            }
            if read_u32(src, cursor) == 0 {
                return Ok(Scan::Complete(next));
            }
            cursor = next;
        }
    }
}

impl Default for Lz4FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for Lz4FrameCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Bytes>> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => match self.start_frame(src)? {
                Some(pending) => pending,
                None => return Ok(None),
            },
        };

        match pending {
            PendingFrame::Skippable { len } => {
                if src.len() < len {
                    src.reserve(len - src.len());
                    self.pending = Some(pending);
                    return Ok(None);
                }
                src.advance(len);
                trace!(len, "skipped frame");
                Ok(Some(Bytes::new()))
            }
            PendingFrame::Lz4 { descriptor, cursor } => {
                match self.scan_blocks(src, &descriptor, cursor)? {
                    Scan::Incomplete(cursor) => {
                        self.pending = Some(PendingFrame::Lz4 { descriptor, cursor });
                        Ok(None)
                    }
                    Scan::Complete(len) => {
                        let frame = src.split_to(len);
                        let chunk = decode_frame(&frame, &descriptor)?;
                        trace!(compressed = len, decompressed = chunk.len(), "decoded frame");
                        Ok(Some(chunk))
                    }
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> CodecResult<Option<Bytes>> {
        match self.decode(src)? {
            Some(chunk) => Ok(Some(chunk)),
            None if src.is_empty() => Ok(None),
            None => Err(CodecError::Truncated {
                buffered: src.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SKIPPABLE_MAGIC;
    use futures::TryStreamExt;
    use std::io::Write;
    use tokio_util::codec::FramedRead;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn skippable(payload: &[u8]) -> Vec<u8> {
        let mut out = SKIPPABLE_MAGIC.to_le_bytes().to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn decode_all(codec: &mut Lz4FrameCodec, data: &[u8]) -> CodecResult<Vec<Bytes>> {
        let mut src = BytesMut::from(data);
        let mut chunks = Vec::new();
        while let Some(chunk) = codec.decode_eof(&mut src)? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    #[test]
    fn decodes_single_frame() {
        let data = compress(b"{\"a\":1}\n");
        let chunks = decode_all(&mut Lz4FrameCodec::new(), &data).unwrap();
        assert_eq!(chunks, vec![Bytes::from_static(b"{\"a\":1}\n")]);
    }

    #[test]
    fn decodes_concatenated_frames_one_chunk_each() {
        let mut data = compress(b"first");
        data.extend(compress(b"second"));
        data.extend(compress(b""));
        let chunks = decode_all(&mut Lz4FrameCodec::new(), &data).unwrap();
        assert_eq!(
            chunks,
            vec![
                Bytes::from_static(b"first"),
                Bytes::from_static(b"second"),
                Bytes::new()
            ]
        );
    }

    #[test]
    fn skippable_frames_yield_empty_chunks() {
        let mut data = skippable(b"metadata");
        data.extend(compress(b"payload"));
        let chunks = decode_all(&mut Lz4FrameCodec::new(), &data).unwrap();
        assert_eq!(chunks, vec![Bytes::new(), Bytes::from_static(b"payload")]);
    }

    #[test]
    fn waits_for_complete_frame() {
        let data = compress(b"hello world, hello world");
        let mut codec = Lz4FrameCodec::new();
        let mut src = BytesMut::new();

        for &byte in &data[..data.len() - 1] {
            src.extend_from_slice(&[byte]);
            assert_eq!(codec.decode(&mut src).unwrap(), None);
        }
        assert!(codec.in_frame());

        src.extend_from_slice(&data[data.len() - 1..]);
        let chunk = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&chunk[..], b"hello world, hello world");
        assert!(src.is_empty());
        assert!(!codec.in_frame());
    }

    #[test]
    fn truncated_frame_at_eof() {
        let data = compress(b"truncated payload");
        let result = decode_all(&mut Lz4FrameCodec::new(), &data[..data.len() - 2]);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn garbage_after_frame_is_bad_magic() {
        let mut data = compress(b"ok");
        data.extend_from_slice(b"garbage!");
        let result = decode_all(&mut Lz4FrameCodec::new(), &data);
        assert!(matches!(result, Err(CodecError::BadMagic { .. })));
    }

    #[test]
    fn corrupted_header_is_an_error() {
        let mut data = compress(b"{\"a\":1}\n");
        data[1] ^= 0x55;
        assert!(decode_all(&mut Lz4FrameCodec::new(), &data).is_err());
    }

    #[test]
    fn corrupted_header_checksum_is_corrupt() {
        let mut data = compress(b"{\"a\":1}\n");
        data[6] ^= 0xFF; // header checksum
        let result = decode_all(&mut Lz4FrameCodec::new(), &data);
        assert!(matches!(result, Err(CodecError::Corrupt { .. })));
    }

    #[test]
    fn frame_size_limit_enforced() {
        let payload: Vec<u8> = (0..4096u32).flat_map(|i| i.to_le_bytes()).collect();
        let data = compress(&payload);
        let result = decode_all(&mut Lz4FrameCodec::with_max_frame_size(64), &data);
        assert!(matches!(result, Err(CodecError::FrameTooLarge { max: 64, .. })));
    }

    #[tokio::test]
    async fn framed_read_over_async_reader() {
        let mut data = compress(b"one\n");
        data.extend(compress(b"two\n"));
        let frames = FramedRead::new(&data[..], Lz4FrameCodec::new());
        let chunks: Vec<Bytes> = frames.try_collect().await.unwrap();
        assert_eq!(
            chunks,
            vec![Bytes::from_static(b"one\n"), Bytes::from_static(b"two\n")]
        );
    }

    proptest::proptest! {
        #[test]
        fn any_split_point_decodes_the_same(
            payload in proptest::collection::vec(proptest::num::u8::ANY, 0..2048),
            split in 0usize..4096,
        ) {
            let data = compress(&payload);
            let split = split.min(data.len());
            let mut codec = Lz4FrameCodec::new();
            let mut src = BytesMut::from(&data[..split]);
            let mut out = Vec::new();
            while let Some(chunk) = codec.decode(&mut src).unwrap() {
                out.extend_from_slice(&chunk);
            }
            src.extend_from_slice(&data[split..]);
            while let Some(chunk) = codec.decode_eof(&mut src).unwrap() {
                out.extend_from_slice(&chunk);
            }
            proptest::prop_assert_eq!(out, payload);
        }
    }
}
