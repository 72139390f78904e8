//! Single-record extraction.

use crate::error::{ArchiveError, ArchiveResult, MalformedRecord};
use crate::locator::RecordLocator;
use autoclave_codec::decompress_frames;
use autoclave_storage::{ArchiveFile, RangeFetcher};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recovers one JSON record from the frames holding it.
///
/// The whole frame span is fetched in one request and decompressed in
/// memory; records are small enough that streaming would not pay off. The
/// returned bytes are never parsed.
#[derive(Clone)]
pub struct RecordExtractor {
    fetcher: Arc<dyn RangeFetcher>,
}

impl RecordExtractor {
    /// Creates an extractor reading from `fetcher`.
    pub fn new(fetcher: Arc<dyn RangeFetcher>) -> Self {
        Self { fetcher }
    }

    /// Extracts the record at `locator`.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::InvalidLocator`] for an empty frame span or record
    /// - [`ArchiveError::Fetch`] if the span cannot be fetched or its length
    ///   is wrong
    /// - [`ArchiveError::Decode`] if the frames are corrupt or the record
    ///   fails its boundary checks
    pub async fn extract(&self, locator: &RecordLocator) -> ArchiveResult<Bytes> {
        if locator.intra_size == 0 {
            return Err(ArchiveError::invalid_locator("record size is zero"));
        }
        let range = locator.frame().range()?;
        debug!(
            archive_file = %locator.archive_file,
            frame_off = locator.frame_off,
            frame_size = locator.frame_size,
            intra_off = locator.intra_off,
            intra_size = locator.intra_size,
            "extracting record"
        );

        let compressed = self.fetcher.fetch_range(&locator.archive_file, range).await?;
        let decoded = decompress_frames(&compressed)?;
        let record = slice_record(&decoded, locator.intra_off, locator.intra_size);

        if let Err(e) = check_record(&record, locator.intra_size) {
            warn!(
                archive_file = %locator.archive_file,
                frame_off = locator.frame_off,
                intra_off = locator.intra_off,
                error = %e,
                "malformed record"
            );
            return Err(e.into());
        }
        Ok(record)
    }

    /// Fetches and decompresses a standalone `*.json.lz4` object.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Fetch`] if the object cannot be fetched and
    /// [`ArchiveError::Decode`] if it is not a valid frame sequence.
    pub async fn extract_object(&self, file: &ArchiveFile) -> ArchiveResult<Bytes> {
        let compressed = self.fetcher.fetch_object(file).await?;
        let decoded = decompress_frames(&compressed)?;
        debug!(
            archive_file = %file,
            compressed = compressed.len(),
            decoded = decoded.len(),
            "extracted object"
        );
        Ok(decoded)
    }
}

/// Slices like `decoded[off..off + size]`, clamped to the available bytes.
fn slice_record(decoded: &Bytes, intra_off: u64, intra_size: u64) -> Bytes {
    let len = decoded.len();
    let start = usize::try_from(intra_off).map_or(len, |off| off.min(len));
    let end = usize::try_from(intra_size)
        .map_or(len, |size| start.saturating_add(size).min(len));
    decoded.slice(start..end)
}

fn check_record(record: &[u8], intra_size: u64) -> Result<(), MalformedRecord> {
    if record.len() as u64 != intra_size {
        return Err(MalformedRecord::Length {
            expected: intra_size,
            actual: record.len() as u64,
        });
    }
    match (record.first(), record.last()) {
        (Some(&first), _) if first != b'{' => Err(MalformedRecord::Start { found: first }),
        (_, Some(&last)) if last != b'}' => Err(MalformedRecord::End { found: last }),
        _ => Ok(()),
    }
}
