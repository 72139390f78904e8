//! Incrementally readable range bodies.

use crate::archive::ByteRange;
use crate::error::{FetchError, FetchResult};
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::time::{Instant, Sleep};

/// A boxed byte source for a fetched range.
pub type BodyReader = Pin<Box<dyn AsyncRead + Send>>;

/// The body of a range request.
///
/// The body is read lazily: nothing beyond what the caller pulls through
/// [`RangeBody::into_reader`] is requested from the transport.
pub struct RangeBody {
    range: ByteRange,
    declared_len: Option<u64>,
    reader: BodyReader,
}

impl RangeBody {
    /// Wraps a byte source delivering `range`.
    pub fn new(range: ByteRange, declared_len: Option<u64>, reader: BodyReader) -> Self {
        Self {
            range,
            declared_len,
            reader,
        }
    }

    /// Returns the requested range.
    #[must_use]
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Returns the length announced by the transport, if any.
    #[must_use]
    pub fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }

    /// Fails if the declared length is known and differs from the range.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::LengthMismatch`] on a mismatch.
    pub fn check_declared_len(&self) -> FetchResult<()> {
        match self.declared_len {
            Some(actual) if actual != self.range.len() => Err(FetchError::LengthMismatch {
                expected: self.range.len(),
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Consumes the body and returns its byte source.
    pub fn into_reader(self) -> BodyReader {
        self.reader
    }

    /// Buffers the whole body.
    ///
    /// Reads at most one byte past the range, so an oversized body is
    /// rejected without buffering all of it. For such a body the reported
    /// `actual` length is a lower bound.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the buffered length differs
    /// from the requested range length.
    pub async fn read_to_end(self) -> FetchResult<Bytes> {
        let capacity = usize::try_from(self.range.len()).unwrap_or(usize::MAX);
        let mut buf = Vec::with_capacity(capacity.min(16 * 1024 * 1024));
        self.reader
            .take(self.range.len().saturating_add(1))
            .read_to_end(&mut buf)
            .await?;

        let actual = buf.len() as u64;
        if actual != self.range.len() {
            return Err(FetchError::LengthMismatch {
                expected: self.range.len(),
                actual,
            });
        }
        Ok(Bytes::from(buf))
    }
}

impl fmt::Debug for RangeBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeBody")
            .field("range", &self.range)
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Confirms that a byte source has nothing left to deliver.
///
/// Reads at most one byte. A source that still yields data after every
/// expected byte was consumed is malformed.
///
/// # Errors
///
/// Returns [`FetchError::UnconsumedData`] if a byte could be read, or the
/// underlying read error.
pub async fn ensure_exhausted<R>(reader: &mut R) -> FetchResult<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut byte = [0u8; 1];
    match reader.read(&mut byte).await? {
        0 => Ok(()),
        _ => Err(FetchError::UnconsumedData),
    }
}

/// Fails a read that waits longer than `timeout` for data.
///
/// The clock starts when a read finds nothing buffered and restarts after
/// every read that completes, so a slow but steady source never times out.
/// An expired read fails with [`io::ErrorKind::TimedOut`], which converts
/// to [`FetchError::Timeout`].
pub struct IdleTimeout<R> {
    inner: R,
    timeout: Duration,
    sleep: Pin<Box<Sleep>>,
    waiting: bool,
}

impl<R> IdleTimeout<R> {
    /// Wraps `inner`.
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            sleep: Box::pin(tokio::time::sleep(timeout)),
            waiting: false,
        }
    }

    /// The idle limit.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Mutable access to the wrapped source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwraps the source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for IdleTimeout<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.waiting = false;
                Poll::Ready(result)
            }
            Poll::Pending => {
                if !this.waiting {
                    this.waiting = true;
                    this.sleep.as_mut().reset(Instant::now() + this.timeout);
                }
                match this.sleep.as_mut().poll(cx) {
                    Poll::Ready(()) => {
                        this.waiting = false;
                        Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("no data for {:?}", this.timeout),
                        )))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}

impl<R> fmt::Debug for IdleTimeout<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleTimeout")
            .field("timeout", &self.timeout)
            .field("waiting", &self.waiting)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn body(data: &'static [u8], len: u64, declared: Option<u64>) -> RangeBody {
        RangeBody::new(
            ByteRange::new(0, len).unwrap(),
            declared,
            Box::pin(Cursor::new(data)),
        )
    }

    #[tokio::test]
    async fn read_to_end_exact() {
        let data = body(b"hello", 5, Some(5)).read_to_end().await.unwrap();
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn read_to_end_short_body() {
        let result = body(b"hel", 5, None).read_to_end().await;
        assert!(matches!(
            result,
            Err(FetchError::LengthMismatch {
                expected: 5,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn read_to_end_stops_past_range() {
        let result = body(b"hello world", 5, None).read_to_end().await;
        assert!(matches!(
            result,
            Err(FetchError::LengthMismatch {
                expected: 5,
                actual: 6
            })
        ));
    }

    #[test]
    fn declared_length_checked() {
        assert!(body(b"hello", 5, Some(5)).check_declared_len().is_ok());
        assert!(body(b"hello", 5, None).check_declared_len().is_ok());
        assert!(matches!(
            body(b"hello", 5, Some(9)).check_declared_len(),
            Err(FetchError::LengthMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn exhausted_source() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        assert!(ensure_exhausted(&mut reader).await.is_ok());
    }

    #[tokio::test]
    async fn trailing_byte_detected() {
        let mut reader = Cursor::new(vec![0u8]);
        assert!(matches!(
            ensure_exhausted(&mut reader).await,
            Err(FetchError::UnconsumedData)
        ));
    }

    #[tokio::test]
    async fn steady_source_never_idles_out() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let feeder = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for _ in 0..6 {
                tokio::time::sleep(Duration::from_millis(40)).await;
                writer.write_all(b"abcd").await.unwrap();
            }
        });

        let mut reader = IdleTimeout::new(reader, Duration::from_millis(150));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), 24);
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_source_times_out() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut reader = IdleTimeout::new(reader, Duration::from_millis(50));
        let mut buf = [0u8; 8];
        let err = reader.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(matches!(FetchError::from(err), FetchError::Timeout));
    }

    #[tokio::test]
    async fn idle_clock_starts_when_read_waits() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut reader = IdleTimeout::new(reader, Duration::from_millis(50));

        // Longer than the limit, but nobody is reading yet.
        tokio::time::sleep(Duration::from_millis(120)).await;
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.write_all(b"late").await.unwrap();
        });

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"late");
    }
}
