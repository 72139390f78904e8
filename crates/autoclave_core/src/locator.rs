//! Record locators and report windows.
//!
//! A locator is the byte-coordinate tuple an index row stores for one
//! record. Reports are described by a [`ReportWindow`]: the single byte range
//! covering all of a report's frames, how much of the decompressed stream to
//! skip before the first record, and how many bytes the report has.

use crate::error::{ArchiveError, ArchiveResult};
use autoclave_storage::{ArchiveFile, ByteRange};
use serde::{Deserialize, Serialize};

/// Compressed byte range of one or more concatenated LZ4 frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSpan {
    /// Offset of the first frame in the archive file.
    pub frame_off: u64,
    /// Compressed length of the span.
    pub frame_size: u64,
}

impl FrameSpan {
    /// Creates a frame span.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidLocator`] for an empty or overflowing span.
    pub fn new(frame_off: u64, frame_size: u64) -> ArchiveResult<Self> {
        let span = Self {
            frame_off,
            frame_size,
        };
        span.range()?;
        Ok(span)
    }

    /// Exclusive end offset.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.frame_off.saturating_add(self.frame_size)
    }

    /// The byte range to request.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidLocator`] for an empty or overflowing span.
    pub fn range(&self) -> ArchiveResult<ByteRange> {
        ByteRange::new(self.frame_off, self.frame_size).map_err(|_| {
            ArchiveError::invalid_locator(format!(
                "frame span at {} with size {}",
                self.frame_off, self.frame_size
            ))
        })
    }
}

/// Position of a record inside the decompressed content of a [`FrameSpan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteSlice {
    /// Offset into the decompressed stream.
    pub intra_off: u64,
    /// Record length.
    pub intra_size: u64,
}

/// Where one record lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordLocator {
    /// Archive file holding the record.
    pub archive_file: ArchiveFile,
    /// Offset of the record's first frame.
    pub frame_off: u64,
    /// Compressed length of the frames holding the record.
    pub frame_size: u64,
    /// Offset of the record in the decompressed frames.
    pub intra_off: u64,
    /// Record length in bytes.
    pub intra_size: u64,
}

impl RecordLocator {
    /// Creates a locator.
    pub fn new(archive_file: ArchiveFile, frame: FrameSpan, slice: ByteSlice) -> Self {
        Self {
            archive_file,
            frame_off: frame.frame_off,
            frame_size: frame.frame_size,
            intra_off: slice.intra_off,
            intra_size: slice.intra_size,
        }
    }

    /// The compressed span.
    #[must_use]
    pub fn frame(&self) -> FrameSpan {
        FrameSpan {
            frame_off: self.frame_off,
            frame_size: self.frame_size,
        }
    }

    /// The decompressed slice.
    #[must_use]
    pub fn slice(&self) -> ByteSlice {
        ByteSlice {
            intra_off: self.intra_off,
            intra_size: self.intra_size,
        }
    }

    /// Reconstruction order: `(frame_off, intra_off)` ascending.
    #[must_use]
    pub fn order_key(&self) -> (u64, u64) {
        (self.frame_off, self.intra_off)
    }
}

/// The byte window of a multi-record report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    frame_off: u64,
    len: u64,
    leading_trim: u64,
    report_size: u64,
}

impl ReportWindow {
    /// Creates a window of `len` compressed bytes at `frame_off`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidLocator`] if `len` or `report_size` is
    /// zero, or the window overflows.
    pub fn new(frame_off: u64, len: u64, leading_trim: u64, report_size: u64) -> ArchiveResult<Self> {
        FrameSpan::new(frame_off, len)?;
        if report_size == 0 {
            return Err(ArchiveError::invalid_locator("report size is zero"));
        }
        Ok(Self {
            frame_off,
            len,
            leading_trim,
            report_size,
        })
    }

    /// Derives the window from every member of a report.
    ///
    /// `report_size` counts one separator byte per member.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidLocator`] if `members` is empty,
    /// references more than one archive file, or holds an empty frame span.
    pub fn from_members(members: &[RecordLocator]) -> ArchiveResult<Self> {
        let first = members
            .iter()
            .min_by_key(|m| m.order_key())
            .ok_or_else(|| ArchiveError::invalid_locator("report has no members"))?;
        same_archive(first, members)?;

        let mut end = 0u64;
        let mut report_size = 0u64;
        for member in members {
            end = end.max(member.frame().range()?.end());
            report_size = report_size.saturating_add(member.intra_size.saturating_add(1));
        }
        Self::new(first.frame_off, end - first.frame_off, first.intra_off, report_size)
    }

    /// Offset of the window in the archive file.
    #[must_use]
    pub const fn frame_off(&self) -> u64 {
        self.frame_off
    }

    /// Compressed length of the window.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Always false; windows are non-empty by construction.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Decompressed bytes preceding the first record.
    #[must_use]
    pub const fn leading_trim(&self) -> u64 {
        self.leading_trim
    }

    /// Exact size of the reconstructed report.
    #[must_use]
    pub const fn report_size(&self) -> u64 {
        self.report_size
    }

    /// The byte range to request.
    ///
    /// # Errors
    ///
    /// Never fails for a window built by the constructors.
    pub fn range(&self) -> ArchiveResult<ByteRange> {
        FrameSpan {
            frame_off: self.frame_off,
            frame_size: self.len,
        }
        .range()
    }
}

/// What a resolver knows about a report: its first and last records in
/// reconstruction order plus the precomputed size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportExtent {
    first: RecordLocator,
    last: Option<RecordLocator>,
    report_size: u64,
}

impl ReportExtent {
    /// Creates an extent from the extremal records.
    ///
    /// The two locators may be given in either order. `last` is `None` for a
    /// single-record report.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidLocator`] if the records reference
    /// different archive files.
    pub fn new(
        first: RecordLocator,
        last: Option<RecordLocator>,
        report_size: u64,
    ) -> ArchiveResult<Self> {
        let (first, last) = match last {
            Some(last) if last.order_key() < first.order_key() => (last, Some(first)),
            other => (first, other),
        };
        if let Some(last) = &last {
            same_archive(&first, std::slice::from_ref(last))?;
        }
        Ok(Self {
            first,
            last,
            report_size,
        })
    }

    /// Derives the extent from every member of a report.
    ///
    /// # Errors
    ///
    /// Same as [`ReportWindow::from_members`].
    pub fn from_members(members: &[RecordLocator]) -> ArchiveResult<Self> {
        let window = ReportWindow::from_members(members)?;
        let first = members.iter().min_by_key(|m| m.order_key());
        let last = members.iter().max_by_key(|m| m.order_key());
        match (first, last) {
            (Some(first), Some(last)) if members.len() > 1 => {
                Self::new(first.clone(), Some(last.clone()), window.report_size())
            }
            (Some(first), _) => Self::new(first.clone(), None, window.report_size()),
            _ => Err(ArchiveError::invalid_locator("report has no members")),
        }
    }

    /// Archive file holding the report.
    #[must_use]
    pub fn archive_file(&self) -> &ArchiveFile {
        &self.first.archive_file
    }

    /// The first record.
    #[must_use]
    pub fn first(&self) -> &RecordLocator {
        &self.first
    }

    /// The last record, if distinct from the first.
    #[must_use]
    pub fn last(&self) -> Option<&RecordLocator> {
        self.last.as_ref()
    }

    /// Precomputed report size.
    #[must_use]
    pub fn report_size(&self) -> u64 {
        self.report_size
    }

    /// Computes the byte window covering the report.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidLocator`] for empty spans or a zero
    /// report size.
    pub fn window(&self) -> ArchiveResult<ReportWindow> {
        let last = self.last.as_ref().unwrap_or(&self.first);
        let end = self
            .first
            .frame()
            .range()?
            .end()
            .max(last.frame().range()?.end());
        ReportWindow::new(
            self.first.frame_off,
            end - self.first.frame_off,
            self.first.intra_off,
            self.report_size,
        )
    }
}

fn same_archive(first: &RecordLocator, others: &[RecordLocator]) -> ArchiveResult<()> {
    match others.iter().find(|m| m.archive_file != first.archive_file) {
        Some(other) => Err(ArchiveError::invalid_locator(format!(
            "report spans archive files {} and {}",
            first.archive_file, other.archive_file
        ))),
        None => Ok(()),
    }
}
