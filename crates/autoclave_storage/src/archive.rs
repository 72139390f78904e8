//! Archive file names and byte ranges.

use crate::error::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote archive file, identified by its path relative to a base URL.
///
/// Archive files are immutable and externally owned; the engine only ever
/// reads byte ranges from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArchiveFile(String);

impl ArchiveFile {
    /// Creates an archive file reference after validating the path.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPath`] if the path is empty, absolute,
    /// carries a URL scheme, or contains a `..` segment.
    pub fn new(path: impl Into<String>) -> FetchResult<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(FetchError::invalid_path(path, "empty path"));
        }
        if path.starts_with('/') {
            return Err(FetchError::invalid_path(path, "path must be relative"));
        }
        if path.contains("://") {
            return Err(FetchError::invalid_path(path, "path must not carry a scheme"));
        }
        if path.split('/').any(|segment| segment == "..") {
            return Err(FetchError::invalid_path(path, "parent segments are not allowed"));
        }
        Ok(Self(path))
    }

    /// Returns the relative path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArchiveFile {
    type Error = FetchError;

    fn try_from(path: String) -> FetchResult<Self> {
        Self::new(path)
    }
}

impl From<ArchiveFile> for String {
    fn from(file: ArchiveFile) -> Self {
        file.0
    }
}

impl AsRef<str> for ArchiveFile {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A non-empty byte range `[offset, offset + len)` inside an archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    offset: u64,
    len: u64,
}

impl ByteRange {
    /// Creates a byte range.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRange`] if `len` is zero or the end
    /// overflows `u64`.
    pub fn new(offset: u64, len: u64) -> FetchResult<Self> {
        if len == 0 || offset.checked_add(len).is_none() {
            return Err(FetchError::InvalidRange { offset, len });
        }
        Ok(Self { offset, len })
    }

    /// Returns the first byte offset.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the number of bytes in the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Always false; ranges are non-empty by construction.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns the exclusive end offset.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.len
    }

    /// Returns the inclusive last byte offset.
    #[must_use]
    pub const fn last(&self) -> u64 {
        self.offset + self.len - 1
    }

    /// Renders the `Range` header value (positions are inclusive, RFC 7233).
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.offset, self.last())
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}
