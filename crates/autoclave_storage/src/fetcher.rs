//! Range fetcher trait definition.

use crate::archive::{ArchiveFile, ByteRange};
use crate::body::RangeBody;
use crate::error::FetchResult;
use async_trait::async_trait;
use bytes::Bytes;

/// A read-only source of archive bytes.
///
/// Fetchers are **opaque byte stores**. They know how to deliver a byte
/// range of a named archive file; they do not understand LZ4 frames or
/// records.
///
/// # Invariants
///
/// - `open_range` issues exactly one request per call
/// - `fetch_range` returns exactly `range.len()` bytes or fails
/// - Fetchers hold no per-request state and must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::HttpArchive`] - HTTP `Range` requests against a base URL
/// - [`super::InMemoryArchive`] - For testing
#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Opens a streaming body for `range` of `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the response
    /// status is not a success.
    async fn open_range(&self, file: &ArchiveFile, range: ByteRange) -> FetchResult<RangeBody>;

    /// Fetches a whole object without a `Range` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be fetched.
    async fn fetch_object(&self, file: &ArchiveFile) -> FetchResult<Bytes>;

    /// Fetches and buffers `range` of `file`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FetchError::LengthMismatch`] if the buffered body is
    /// not exactly `range.len()` bytes long, or any transport error.
    async fn fetch_range(&self, file: &ArchiveFile, range: ByteRange) -> FetchResult<Bytes> {
        let body = self.open_range(file, range).await?;
        body.check_declared_len()?;
        body.read_to_end().await
    }
}
