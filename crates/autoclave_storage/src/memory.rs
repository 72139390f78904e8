//! In-memory archive store for testing.

use crate::archive::{ArchiveFile, ByteRange};
use crate::body::{BodyReader, RangeBody};
use crate::error::{FetchError, FetchResult};
use crate::fetcher::RangeFetcher;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::io::StreamReader;

/// An in-memory archive store.
///
/// This store keeps whole archive objects in memory and serves byte ranges
/// the way an HTTP server answering `Range` requests would:
/// - a range reaching past the end of the object is clamped, producing a
///   short body
/// - a range starting past the end answers 416
/// - a missing object answers 404
///
/// Bodies can be delivered in fixed-size pieces to mimic network chunking.
///
/// # Example
///
/// ```rust
/// use autoclave_storage::{ArchiveFile, ByteRange, InMemoryArchive, RangeFetcher};
///
/// # tokio_test_block_on(async {
/// let archive = InMemoryArchive::new();
/// archive.insert("a.bin", b"hello world".to_vec());
///
/// let file = ArchiveFile::new("a.bin").unwrap();
/// let data = archive.fetch_range(&file, ByteRange::new(6, 5).unwrap()).await.unwrap();
/// assert_eq!(&data[..], b"world");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryArchive {
    objects: RwLock<HashMap<String, Bytes>>,
    read_chunk: Option<usize>,
    requests: AtomicU64,
}

impl InMemoryArchive {
    /// Creates an empty in-memory archive store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers bodies in pieces of at most `size` bytes.
    #[must_use]
    pub fn with_read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = Some(size.max(1));
        self
    }

    /// Stores (or replaces) an object.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(path.into(), data.into());
    }

    /// Removes an object, returning its bytes.
    pub fn remove(&self, path: &str) -> Option<Bytes> {
        self.objects.write().remove(path)
    }

    /// Returns a copy of a stored object.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.objects.read().get(path).cloned()
    }

    /// Returns the number of requests served so far.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn lookup(&self, file: &ArchiveFile) -> FetchResult<Bytes> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.get(file.as_str()).ok_or_else(|| FetchError::Status {
            status: 404,
            url: memory_url(file),
        })
    }

    fn reader(&self, data: Bytes) -> BodyReader {
        match self.read_chunk {
            Some(size) => {
                let pieces: Vec<io::Result<Bytes>> = (0..data.len())
                    .step_by(size)
                    .map(|start| Ok(data.slice(start..(start + size).min(data.len()))))
                    .collect();
                Box::pin(StreamReader::new(futures::stream::iter(pieces)))
            }
            None => Box::pin(Cursor::new(data)),
        }
    }
}

fn memory_url(file: &ArchiveFile) -> String {
    format!("memory:///{file}")
}

#[async_trait]
impl RangeFetcher for InMemoryArchive {
    async fn open_range(&self, file: &ArchiveFile, range: ByteRange) -> FetchResult<RangeBody> {
        let data = self.lookup(file)?;
        let size = data.len() as u64;

        if range.offset() >= size {
            return Err(FetchError::Status {
                status: 416,
                url: memory_url(file),
            });
        }

        // Clamp like an HTTP server does for ranges past the end.
        let start = range.offset() as usize;
        let end = range.end().min(size) as usize;
        let slice = data.slice(start..end);

        Ok(RangeBody::new(
            range,
            Some(slice.len() as u64),
            self.reader(slice),
        ))
    }

    async fn fetch_object(&self, file: &ArchiveFile) -> FetchResult<Bytes> {
        self.lookup(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn file(name: &str) -> ArchiveFile {
        ArchiveFile::new(name).unwrap()
    }

    #[tokio::test]
    async fn memory_fetch_range_returns_slice() {
        let archive = InMemoryArchive::new();
        archive.insert("a.bin", b"hello world".to_vec());

        let data = archive
            .fetch_range(&file("a.bin"), ByteRange::new(0, 5).unwrap())
            .await
            .unwrap();
        assert_eq!(&data[..], b"hello");
        assert_eq!(archive.request_count(), 1);
    }

    #[tokio::test]
    async fn memory_missing_object_is_404() {
        let archive = InMemoryArchive::new();
        let result = archive
            .fetch_range(&file("missing.bin"), ByteRange::new(0, 1).unwrap())
            .await;
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn memory_range_past_end_is_short() {
        let archive = InMemoryArchive::new();
        archive.insert("a.bin", b"hello".to_vec());

        let result = archive
            .fetch_range(&file("a.bin"), ByteRange::new(2, 10).unwrap())
            .await;
        assert!(matches!(
            result,
            Err(FetchError::LengthMismatch {
                expected: 10,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn memory_range_starting_past_end_is_416() {
        let archive = InMemoryArchive::new();
        archive.insert("a.bin", b"hello".to_vec());

        let result = archive
            .open_range(&file("a.bin"), ByteRange::new(5, 1).unwrap())
            .await;
        assert!(matches!(result, Err(FetchError::Status { status: 416, .. })));
    }

    #[tokio::test]
    async fn memory_chunked_reader_delivers_everything() {
        let archive = InMemoryArchive::new().with_read_chunk(3);
        archive.insert("a.bin", b"0123456789".to_vec());

        let body = archive
            .open_range(&file("a.bin"), ByteRange::new(1, 8).unwrap())
            .await
            .unwrap();
        assert_eq!(body.declared_len(), Some(8));

        let mut reader = body.into_reader();
        let mut first = [0u8; 8];
        let n = reader.read(&mut first).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&first[..n], b"123");

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"45678");
    }

    #[tokio::test]
    async fn memory_fetch_object_returns_whole_object() {
        let archive = InMemoryArchive::new();
        archive.insert("m/1.json.lz4", b"payload".to_vec());

        let data = archive.fetch_object(&file("m/1.json.lz4")).await.unwrap();
        assert_eq!(&data[..], b"payload");
    }

    #[test]
    fn memory_remove() {
        let archive = InMemoryArchive::new();
        archive.insert("a.bin", b"x".to_vec());
        assert!(archive.remove("a.bin").is_some());
        assert!(archive.get("a.bin").is_none());
    }
}
