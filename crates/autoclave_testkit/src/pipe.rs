//! A fetcher whose body is fed by the test.
//!
//! Lets tests control exactly when bytes arrive: stall the source, deliver
//! one frame at a time, or watch for the reader hanging up.

use async_trait::async_trait;
use autoclave_storage::{ArchiveFile, ByteRange, FetchError, FetchResult, RangeBody, RangeFetcher};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::DuplexStream;

/// A [`RangeFetcher`] serving one range body from an in-process pipe.
///
/// The first `open_range` call takes the read half; later calls fail.
#[derive(Debug)]
pub struct PipeArchive {
    reader: Mutex<Option<DuplexStream>>,
    declared_len: Option<u64>,
}

impl PipeArchive {
    /// Creates the fetcher and the write half feeding it.
    pub fn new(capacity: usize) -> (Self, DuplexStream) {
        let (writer, reader) = tokio::io::duplex(capacity);
        (
            Self {
                reader: Mutex::new(Some(reader)),
                declared_len: None,
            },
            writer,
        )
    }

    /// Announces a body length, as a `Content-Length` header would.
    #[must_use]
    pub fn with_declared_len(mut self, len: u64) -> Self {
        self.declared_len = Some(len);
        self
    }
}

#[async_trait]
impl RangeFetcher for PipeArchive {
    async fn open_range(&self, _file: &ArchiveFile, range: ByteRange) -> FetchResult<RangeBody> {
        let reader = self
            .reader
            .lock()
            .take()
            .ok_or_else(|| FetchError::transport("pipe already opened"))?;
        Ok(RangeBody::new(range, self.declared_len, Box::pin(reader)))
    }

    async fn fetch_object(&self, file: &ArchiveFile) -> FetchResult<Bytes> {
        Err(FetchError::Status {
            status: 404,
            url: format!("pipe:///{file}"),
        })
    }
}
