//! Archive builders.
//!
//! Packs JSON records into LZ4 frames the way the archive packer does and
//! reports where each record ended up, so tests can compare engine output
//! against known content.

use autoclave_codec::frame_index;
use autoclave_core::{ByteSlice, FrameSpan, RecordLocator, ReportWindow};
use autoclave_storage::{ArchiveFile, InMemoryArchive};
use bytes::Bytes;
use std::io::Write;
use std::ops::Range;

/// Builds an archive file frame by frame.
///
/// ```rust
/// use autoclave_testkit::ArchiveBuilder;
///
/// let archive = ArchiveBuilder::new("a.bin")
///     .record(br#"{"a":1}"#)
///     .frame()
///     .record_unterminated(br#"{"z"}"#)
///     .build();
///
/// assert_eq!(archive.records.len(), 2);
/// assert_eq!(archive.window(0..2).report_size(), 14);
/// assert_eq!(archive.expected_report(0..2), b"{\"a\":1}\n{\"z\"}\n");
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    file: ArchiveFile,
    data: Vec<u8>,
    current: Vec<u8>,
    flushed: u64,
    records: Vec<(u64, Bytes)>,
}

impl ArchiveBuilder {
    /// Starts an archive named `path`.
    pub fn new(path: &str) -> Self {
        Self {
            file: ArchiveFile::new(path).expect("valid archive path"),
            data: Vec::new(),
            current: Vec::new(),
            flushed: 0,
            records: Vec::new(),
        }
    }

    fn position(&self) -> u64 {
        self.flushed + self.current.len() as u64
    }

    /// Appends a record followed by its newline separator.
    pub fn record(mut self, json: &[u8]) -> Self {
        self.records.push((self.position(), Bytes::copy_from_slice(json)));
        self.current.extend_from_slice(json);
        self.current.push(b'\n');
        self
    }

    /// Appends a record without a newline separator.
    pub fn record_unterminated(mut self, json: &[u8]) -> Self {
        self.records.push((self.position(), Bytes::copy_from_slice(json)));
        self.current.extend_from_slice(json);
        self
    }

    /// Appends a record whose first `at` bytes close the current frame.
    pub fn record_split(mut self, json: &[u8], at: usize) -> Self {
        let at = at.min(json.len());
        self.records.push((self.position(), Bytes::copy_from_slice(json)));
        self.current.extend_from_slice(&json[..at]);
        self = self.frame();
        self.current.extend_from_slice(&json[at..]);
        self.current.push(b'\n');
        self
    }

    /// Appends bytes that belong to no record.
    pub fn padding(mut self, bytes: &[u8]) -> Self {
        self.current.extend_from_slice(bytes);
        self
    }

    /// Closes the current frame. Does nothing if the frame is empty.
    pub fn frame(mut self) -> Self {
        if self.current.is_empty() {
            return self;
        }
        let content = std::mem::take(&mut self.current);
        self.flushed += content.len() as u64;
        self.data.extend(compress(&content));
        self
    }

    /// Closes the current frame and appends a skippable frame.
    pub fn skippable(mut self, payload: &[u8]) -> Self {
        self = self.frame();
        self.data
            .extend_from_slice(&autoclave_codec::SKIPPABLE_MAGIC.to_le_bytes());
        self.data
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.data.extend_from_slice(payload);
        self
    }

    /// Closes the last frame and computes every record's locator.
    pub fn build(self) -> BuiltArchive {
        let builder = self.frame();
        let index = frame_index(&builder.data).expect("builder produces valid frames");

        // (compressed offset, compressed end, decompressed start, decompressed end)
        let mut frames = Vec::with_capacity(index.len());
        let mut decompressed = 0u64;
        for info in index.iter().filter(|info| info.decompressed_len > 0) {
            frames.push((
                info.offset,
                info.offset + info.compressed_len,
                decompressed,
                decompressed + info.decompressed_len,
            ));
            decompressed += info.decompressed_len;
        }

        let containing = |pos: u64| {
            frames
                .iter()
                .find(|(_, _, start, end)| *start <= pos && pos < *end)
                .copied()
                .expect("record inside archive content")
        };

        let records = builder
            .records
            .iter()
            .map(|(start, json)| {
                let first = containing(*start);
                let last = containing(start + (json.len() as u64).max(1) - 1);
                RecordLocator::new(
                    builder.file.clone(),
                    FrameSpan {
                        frame_off: first.0,
                        frame_size: last.1 - first.0,
                    },
                    ByteSlice {
                        intra_off: start - first.2,
                        intra_size: json.len() as u64,
                    },
                )
            })
            .collect();

        BuiltArchive {
            file: builder.file,
            data: Bytes::from(builder.data),
            records,
            contents: builder.records.into_iter().map(|(_, json)| json).collect(),
        }
    }
}

/// A finished archive with the locators of its records.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    /// Archive file name.
    pub file: ArchiveFile,
    /// Compressed archive bytes.
    pub data: Bytes,
    /// Locator of every record, in insertion order.
    pub records: Vec<RecordLocator>,
    /// JSON bytes of every record, in insertion order.
    pub contents: Vec<Bytes>,
}

impl BuiltArchive {
    /// Window covering the records in `members`.
    pub fn window(&self, members: Range<usize>) -> ReportWindow {
        ReportWindow::from_members(&self.records[members]).expect("valid report members")
    }

    /// What reconstructing `members` must produce.
    pub fn expected_report(&self, members: Range<usize>) -> Vec<u8> {
        let mut out = Vec::new();
        for json in &self.contents[members] {
            out.extend_from_slice(json);
            out.push(b'\n');
        }
        out
    }

    /// Stores the archive in an in-memory fetcher.
    pub fn store(&self) -> InMemoryArchive {
        let archive = InMemoryArchive::new();
        self.install(&archive);
        archive
    }

    /// Adds the archive to an existing in-memory fetcher.
    pub fn install(&self, archive: &InMemoryArchive) {
        archive.insert(self.file.as_str(), self.data.clone());
    }
}

/// Compresses `content` into a single LZ4 frame.
pub fn compress(content: &[u8]) -> Vec<u8> {
    let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
    encoder.write_all(content).expect("write to Vec");
    encoder.finish().expect("finish frame")
}
