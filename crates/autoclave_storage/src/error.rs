//! Error types for archive fetch operations.

use std::io;
use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching bytes from an archive store.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The archive filename cannot be resolved against the base URL.
    #[error("invalid archive path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected filename.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested byte range is empty or overflows.
    #[error("invalid byte range: offset {offset}, len {len}")]
    InvalidRange {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: u64,
    },

    /// The server answered with a non-success status.
    #[error("HTTP status {status} fetching {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The URL that was requested.
        url: String,
    },

    /// The body length does not match the requested range.
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Requested length.
        expected: u64,
        /// Length actually delivered (or declared).
        actual: u64,
    },

    /// Bytes remain in the source after everything expected was consumed.
    #[error("unconsumed data left in byte source")]
    UnconsumedData,

    /// The fetch did not complete in time.
    #[error("fetch timed out")]
    Timeout,

    /// Network or transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// An I/O error occurred while reading the body.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl FetchError {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if restarting the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport { .. } | Self::Io(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(err),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = err.status() {
            return Self::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        Self::transport(err.to_string())
    }
}

/// Converts a body stream error into an `io::Error`, preserving timeouts.
pub(crate) fn reqwest_to_io(err: reqwest::Error) -> io::Error {
    if err.is_timeout() {
        io::Error::new(io::ErrorKind::TimedOut, err)
    } else {
        io::Error::other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_io_maps_to_timeout() {
        let err: FetchError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, FetchError::Timeout));
        assert!(err.is_retryable());
    }

    #[test]
    fn other_io_stays_io() {
        let err: FetchError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = FetchError::Status {
            status: 404,
            url: "http://x/a.bin".into(),
        };
        assert!(!err.is_retryable());

        let err = FetchError::Status {
            status: 503,
            url: "http://x/a.bin".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn length_mismatch_message() {
        let err = FetchError::LengthMismatch {
            expected: 120,
            actual: 100,
        };
        assert_eq!(
            err.to_string(),
            "length mismatch: expected 120 bytes, got 100"
        );
    }
}
