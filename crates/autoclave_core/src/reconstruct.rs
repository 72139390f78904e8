//! Streaming report reconstruction.
//!
//! A report is a run of newline-terminated JSON records spread over one or
//! more consecutive LZ4 frames. The reader fetches the whole window in one
//! request and decodes it frame by frame, so memory use is bounded by the
//! largest frame rather than by the report.
//!
//! ## Stream contract
//!
//! 1. The first decompressed bytes up to `leading_trim` are dropped.
//! 2. Output is capped at `report_size` bytes.
//! 3. The first emitted byte must be `{`. A chunk that exactly completes the
//!    report (with more than one byte still owed) must end with `\n`.
//! 4. Once at most one byte is owed, the source must be exhausted.
//! 5. If exactly one byte is owed, it is the final record's newline, which
//!    the packer does not always store, and is emitted as `\n`.
//!
//! A failure after output has begun cannot retract what was emitted.
//! Callers serving HTTP should pull the first chunk before committing a
//! success status and treat any later error as a truncated response.

use crate::config::EngineConfig;
use crate::error::{ArchiveError, ArchiveResult, IntegrityError};
use crate::locator::ReportWindow;
use autoclave_codec::Lz4FrameCodec;
use autoclave_storage::{
    ensure_exhausted, ArchiveFile, BodyReader, FetchError, IdleTimeout, RangeFetcher,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

type Frames = FramedRead<IdleTimeout<BodyReader>, Lz4FrameCodec>;

/// Creates [`ReportReader`]s.
#[derive(Clone)]
pub struct ReportReconstructor {
    fetcher: Arc<dyn RangeFetcher>,
    config: EngineConfig,
}

impl ReportReconstructor {
    /// Creates a reconstructor reading from `fetcher`.
    pub fn new(fetcher: Arc<dyn RangeFetcher>, config: EngineConfig) -> Self {
        Self { fetcher, config }
    }

    /// Returns a reader for the report in `window` of `file`.
    ///
    /// No I/O happens until the first chunk is pulled.
    pub fn reconstruct(&self, file: &ArchiveFile, window: ReportWindow) -> ReportReader {
        ReportReader {
            fetcher: Arc::clone(&self.fetcher),
            config: self.config.clone(),
            file: file.clone(),
            window,
            state: ReconstructionState::Init,
            frames: None,
            trim: window.leading_trim(),
            remaining: window.report_size(),
            at_start: true,
            emitted: 0,
        }
    }
}

/// Lifecycle of a [`ReportReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionState {
    /// Nothing fetched yet.
    Init,
    /// The window is open and chunks are flowing.
    Streaming,
    /// Every byte of the report was emitted and checked.
    Complete,
    /// A fetch, decode or integrity error ended the stream.
    Failed,
}

/// Pull-based reader producing a report's bytes.
///
/// Network reads only happen inside [`ReportReader::next_chunk`], so a slow
/// consumer slows the download down instead of growing a buffer. Dropping
/// the reader closes the connection.
pub struct ReportReader {
    fetcher: Arc<dyn RangeFetcher>,
    config: EngineConfig,
    file: ArchiveFile,
    window: ReportWindow,
    state: ReconstructionState,
    frames: Option<Frames>,
    trim: u64,
    remaining: u64,
    at_start: bool,
    emitted: u64,
}

impl ReportReader {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReconstructionState {
        self.state
    }

    /// Bytes emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// The window being reconstructed.
    #[must_use]
    pub fn window(&self) -> &ReportWindow {
        &self.window
    }

    /// Pulls the next chunk of the report.
    ///
    /// Returns `Ok(None)` once the report is complete, and after a failure.
    /// Chunks are never empty.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Fetch`] if the window cannot be fetched, its length
    ///   is wrong, or a read times out
    /// - [`ArchiveError::Decode`] if a frame is corrupt or truncated
    /// - [`ArchiveError::Integrity`] if the report boundaries do not hold
    pub async fn next_chunk(&mut self) -> ArchiveResult<Option<Bytes>> {
        if matches!(
            self.state,
            ReconstructionState::Complete | ReconstructionState::Failed
        ) {
            return Ok(None);
        }

        match self.advance().await {
            Ok(Some(chunk)) => {
                self.emitted += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Ok(None) => {
                self.state = ReconstructionState::Complete;
                debug!(archive_file = %self.file, emitted = self.emitted, "report complete");
                Ok(None)
            }
            Err(e) => {
                self.state = ReconstructionState::Failed;
                self.frames = None;
                warn!(
                    archive_file = %self.file,
                    frame_off = self.window.frame_off(),
                    emitted = self.emitted,
                    error = %e,
                    "report reconstruction failed"
                );
                Err(e)
            }
        }
    }

    /// Adapts the reader into a stream of chunks.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = ArchiveResult<Bytes>> + Send + 'static {
        futures::stream::try_unfold(self, |mut reader| async move {
            Ok(reader.next_chunk().await?.map(|chunk| (chunk, reader)))
        })
    }

    async fn advance(&mut self) -> ArchiveResult<Option<Bytes>> {
        if self.state == ReconstructionState::Init {
            let frames = open(
                Arc::clone(&self.fetcher),
                self.file.clone(),
                self.window,
                self.config.clone(),
            )
            .await?;
            self.frames = Some(frames);
            self.state = ReconstructionState::Streaming;
        }

        loop {
            if self.remaining <= 1 {
                return self.finish().await;
            }
            let Some(frames) = self.frames.as_mut() else {
                return self.finish().await;
            };

            let Some(chunk) = frames.next().await.transpose()? else {
                // The decoder already saw the end of the source.
                self.frames = None;
                return self.finish().await;
            };
            if let Some(chunk) = self.accept(chunk)? {
                return Ok(Some(chunk));
            }
        }
    }

    /// Trims, caps and checks one decompressed chunk. Returns `None` if
    /// nothing is left to emit.
    fn accept(&mut self, mut chunk: Bytes) -> Result<Option<Bytes>, IntegrityError> {
        if self.trim > 0 && !chunk.is_empty() {
            let skip = usize::try_from(self.trim).map_or(chunk.len(), |t| t.min(chunk.len()));
            chunk = chunk.slice(skip..);
            self.trim -= skip as u64;
        }
        if chunk.len() as u64 > self.remaining {
            chunk.truncate(self.remaining as usize);
        }
        let (Some(&first), Some(&last)) = (chunk.first(), chunk.last()) else {
            return Ok(None);
        };

        if self.at_start && first != b'{' {
            return Err(IntegrityError::BadStart { found: first });
        }
        if self.remaining == chunk.len() as u64 && self.remaining > 1 && last != b'\n' {
            return Err(IntegrityError::BadEnd { found: last });
        }

        self.remaining -= chunk.len() as u64;
        self.at_start = false;
        Ok(Some(chunk))
    }

    /// Checks the source is exhausted, then settles the final byte.
    async fn finish(&mut self) -> ArchiveResult<Option<Bytes>> {
        if let Some(mut frames) = self.frames.take() {
            if !frames.read_buffer().is_empty() {
                return Err(IntegrityError::TrailingData.into());
            }
            match ensure_exhausted(frames.get_mut()).await {
                Err(FetchError::UnconsumedData) => return Err(IntegrityError::TrailingData.into()),
                Err(e) => return Err(e.into()),
                Ok(()) => {}
            }
        }

        match self.remaining {
            0 => Ok(None),
            1 => {
                self.remaining = 0;
                Ok(Some(Bytes::from_static(b"\n")))
            }
            _ => Err(ArchiveError::Integrity(IntegrityError::SizeMismatch {
                expected: self.window.report_size(),
                emitted: self.emitted,
            })),
        }
    }
}

/// Opens the window and wraps its body in the frame decoder.
///
/// The returned future owns its inputs and borrows nothing from the reader.
/// The wait for the response and every later body read are each bounded by
/// `read_timeout`.
async fn open(
    fetcher: Arc<dyn RangeFetcher>,
    file: ArchiveFile,
    window: ReportWindow,
    config: EngineConfig,
) -> ArchiveResult<Frames> {
    let range = window.range()?;
    debug!(
        archive_file = %file,
        range = %range.header_value(),
        leading_trim = window.leading_trim(),
        report_size = window.report_size(),
        "opening report window"
    );

    let body = timeout(config.read_timeout, fetcher.open_range(&file, range))
        .await
        .map_err(|_| FetchError::Timeout)??;
    body.check_declared_len()?;

    Ok(FramedRead::new(
        IdleTimeout::new(body.into_reader(), config.read_timeout),
        Lz4FrameCodec::with_max_frame_size(config.max_frame_size),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use autoclave_storage::InMemoryArchive;
    use std::io::Write;
    use std::time::Duration;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn archive_of(frames: &[&[u8]]) -> (Vec<u8>, Vec<u64>) {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for frame in frames {
            offsets.push(data.len() as u64);
            data.extend(compress(frame));
        }
        offsets.push(data.len() as u64);
        (data, offsets)
    }

    fn reconstructor(data: Vec<u8>, read_chunk: Option<usize>) -> ReportReconstructor {
        let mut archive = InMemoryArchive::new();
        if let Some(size) = read_chunk {
            archive = archive.with_read_chunk(size);
        }
        archive.insert("r.bin", data);
        ReportReconstructor::new(Arc::new(archive), EngineConfig::default())
    }

    async fn collect(reader: &mut ReportReader) -> ArchiveResult<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = reader.next_chunk().await? {
            assert!(!chunk.is_empty());
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    fn file() -> ArchiveFile {
        ArchiveFile::new("r.bin").unwrap()
    }

    #[tokio::test]
    async fn synthesizes_missing_final_newline() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n", b"{\"z\"}"]);
        let window = ReportWindow::new(0, offsets[2], 0, 14).unwrap();
        let mut reader = reconstructor(data, None).reconstruct(&file(), window);

        assert_eq!(reader.state(), ReconstructionState::Init);
        let out = collect(&mut reader).await.unwrap();
        assert_eq!(out, b"{\"a\":1}\n{\"z\"}\n");
        assert_eq!(reader.state(), ReconstructionState::Complete);
        assert_eq!(reader.emitted(), 14);
    }

    #[tokio::test]
    async fn stored_final_newline_is_not_doubled() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n", b"{\"z\"}\n"]);
        let window = ReportWindow::new(0, offsets[2], 0, 14).unwrap();
        let out = collect(&mut reconstructor(data, Some(3)).reconstruct(&file(), window))
            .await
            .unwrap();
        assert_eq!(out, b"{\"a\":1}\n{\"z\"}\n");
    }

    #[tokio::test]
    async fn leading_trim_spans_chunks() {
        let (data, offsets) = archive_of(&[b"{\"o\":", b"0}\n{\"a\":1}\n", b"{\"b\":2}\n"]);
        let window = ReportWindow::new(0, offsets[3], 8, 16).unwrap();
        let out = collect(&mut reconstructor(data, None).reconstruct(&file(), window))
            .await
            .unwrap();
        assert_eq!(out, b"{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test]
    async fn window_in_the_middle_of_archive() {
        let (data, offsets) = archive_of(&[b"{\"before\":1}\n", b"{\"a\":1}\n", b"{\"after\":1}\n"]);
        let window = ReportWindow::new(offsets[1], offsets[2] - offsets[1], 0, 8).unwrap();
        let out = collect(&mut reconstructor(data, Some(1)).reconstruct(&file(), window))
            .await
            .unwrap();
        assert_eq!(out, b"{\"a\":1}\n");
    }

    #[tokio::test]
    async fn bad_start() {
        let (data, offsets) = archive_of(&[b" {\"a\":1}\n"]);
        let window = ReportWindow::new(0, offsets[1], 0, 9).unwrap();
        let mut reader = reconstructor(data, None).reconstruct(&file(), window);
        let result = collect(&mut reader).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Integrity(IntegrityError::BadStart { found: b' ' }))
        ));
        assert_eq!(reader.state(), ReconstructionState::Failed);
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_end() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}x", b"{\"z\"}"]);
        let window = ReportWindow::new(0, offsets[1], 0, 8).unwrap();
        let result = collect(&mut reconstructor(data, None).reconstruct(&file(), window)).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Integrity(IntegrityError::BadEnd { found: b'x' }))
        ));
    }

    #[tokio::test]
    async fn extra_frame_is_trailing_data() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n", b"{\"extra\":1}\n"]);
        let window = ReportWindow::new(0, offsets[2], 0, 8).unwrap();
        let result = collect(&mut reconstructor(data, Some(4)).reconstruct(&file(), window)).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Integrity(IntegrityError::TrailingData))
        ));
    }

    #[tokio::test]
    async fn short_content_is_size_mismatch() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n"]);
        let window = ReportWindow::new(0, offsets[1], 0, 20).unwrap();
        let result = collect(&mut reconstructor(data, None).reconstruct(&file(), window)).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Integrity(IntegrityError::SizeMismatch {
                expected: 20,
                emitted: 8
            }))
        ));
    }

    #[tokio::test]
    async fn window_past_end_is_length_mismatch() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n"]);
        let window = ReportWindow::new(0, offsets[1] + 32, 0, 8).unwrap();
        let result = collect(&mut reconstructor(data, None).reconstruct(&file(), window)).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Fetch(FetchError::LengthMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn corrupt_frame_is_decode_error() {
        let (mut data, offsets) = archive_of(&[b"{\"a\":1}\n"]);
        data[1] ^= 0xFF;
        let window = ReportWindow::new(0, offsets[1], 0, 8).unwrap();
        let result = collect(&mut reconstructor(data, None).reconstruct(&file(), window)).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Decode(DecodeError::Frame(_)))
        ));
    }

    #[tokio::test]
    async fn truncated_window_is_decode_error() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n", b"{\"b\":2}\n"]);
        let window = ReportWindow::new(0, offsets[2] - 3, 0, 16).unwrap();
        let result = collect(&mut reconstructor(data, Some(5)).reconstruct(&file(), window)).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Decode(DecodeError::Frame(_)))
        ));
    }

    #[tokio::test]
    async fn missing_archive_fails_on_first_pull() {
        let reconstructor = reconstructor(Vec::new(), None);
        let window = ReportWindow::new(0, 10, 0, 8).unwrap();
        let mut reader = reconstructor.reconstruct(&ArchiveFile::new("nope.bin").unwrap(), window);
        assert_eq!(reader.state(), ReconstructionState::Init);
        assert!(matches!(
            reader.next_chunk().await,
            Err(ArchiveError::Fetch(FetchError::Status { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn skippable_frames_do_not_emit() {
        let mut data = 0x184D_2A50u32.to_le_bytes().to_vec();
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"meta");
        data.extend(compress(b"{\"a\":1}\n"));
        let len = data.len() as u64;
        let window = ReportWindow::new(0, len, 0, 8).unwrap();
        let out = collect(&mut reconstructor(data, None).reconstruct(&file(), window))
            .await
            .unwrap();
        assert_eq!(out, b"{\"a\":1}\n");
    }

    #[tokio::test]
    async fn stream_adapter_yields_all_chunks() {
        use futures::TryStreamExt;

        let (data, offsets) = archive_of(&[b"{\"a\":1}\n", b"{\"z\"}"]);
        let window = ReportWindow::new(0, offsets[2], 0, 14).unwrap();
        let reader = reconstructor(data, None).reconstruct(&file(), window);
        let chunks: Vec<Bytes> = reader.into_stream().try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), b"{\"a\":1}\n{\"z\"}\n");
    }

    #[tokio::test]
    async fn stream_runs_on_a_spawned_task() {
        use futures::TryStreamExt;

        let (data, offsets) = archive_of(&[b"{\"a\":1}\n", b"{\"z\"}"]);
        let window = ReportWindow::new(0, offsets[2], 0, 14).unwrap();
        let stream = reconstructor(data, Some(5))
            .reconstruct(&file(), window)
            .into_stream();

        let chunks = tokio::spawn(async move { stream.try_collect::<Vec<Bytes>>().await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunks.concat(), b"{\"a\":1}\n{\"z\"}\n");
    }

    #[tokio::test]
    async fn reader_is_sendable_before_first_pull() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n"]);
        let window = ReportWindow::new(0, offsets[1], 0, 8).unwrap();
        let mut reader = reconstructor(data, None).reconstruct(&file(), window);

        let out = tokio::spawn(async move { collect(&mut reader).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, b"{\"a\":1}\n");
    }

    #[tokio::test]
    async fn frame_size_limit_applies() {
        let (data, offsets) = archive_of(&[b"{\"a\":1}\n"]);
        let mut archive = InMemoryArchive::new();
        archive = archive.with_read_chunk(64);
        archive.insert("r.bin", data);
        let reconstructor = ReportReconstructor::new(
            Arc::new(archive),
            EngineConfig::new()
                .max_frame_size(8)
                .read_timeout(Duration::from_secs(5)),
        );
        let window = ReportWindow::new(0, offsets[1], 0, 8).unwrap();
        let result = collect(&mut reconstructor.reconstruct(&file(), window)).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Decode(DecodeError::Frame(_)))
        ));
    }
}
