//! Error types for record extraction and report reconstruction.

use autoclave_codec::CodecError;
use autoclave_storage::FetchError;
use thiserror::Error;

/// Result type for engine operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors returned by the engine.
///
/// Fetch, decode and integrity failures are distinct so callers can tell a
/// flaky store from a corrupt archive or a bad index row.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The resolver has no entry for the identifier.
    #[error("not found: {id}")]
    NotFound {
        /// The identifier that was looked up.
        id: String,
    },

    /// The locator is unusable (zero sizes, mixed archive files, empty set).
    #[error("invalid locator: {message}")]
    InvalidLocator {
        /// Description of the problem.
        message: String,
    },

    /// The archive bytes could not be fetched.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The fetched bytes could not be decoded into a record.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The reconstructed report does not match its declared boundaries.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
}

impl ArchiveError {
    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates an invalid locator error.
    pub fn invalid_locator(message: impl Into<String>) -> Self {
        Self::InvalidLocator {
            message: message.into(),
        }
    }

    /// Returns true if the resolver had nothing for the identifier.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if restarting the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<CodecError> for ArchiveError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Io(io) => Self::Fetch(FetchError::from(io)),
            other => Self::Decode(DecodeError::Frame(other)),
        }
    }
}

/// Errors turning fetched bytes into record bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The LZ4 frames are corrupt or truncated.
    #[error("frame error: {0}")]
    Frame(CodecError),

    /// The sliced record failed a boundary check.
    #[error("malformed record: {0}")]
    MalformedRecord(MalformedRecord),
}

/// The boundary check a single record failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    /// The slice is shorter than the locator says.
    #[error("length {actual}, expected {expected}")]
    Length {
        /// `intra_size` from the locator.
        expected: u64,
        /// Bytes actually available.
        actual: u64,
    },

    /// The first byte is not `{`.
    #[error("first byte {found:#04x}, expected '{{'")]
    Start {
        /// The byte found.
        found: u8,
    },

    /// The last byte is not `}`.
    #[error("last byte {found:#04x}, expected '}}'")]
    End {
        /// The byte found.
        found: u8,
    },
}

impl From<MalformedRecord> for ArchiveError {
    fn from(e: MalformedRecord) -> Self {
        Self::Decode(DecodeError::MalformedRecord(e))
    }
}

/// Report stream boundary violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    /// The first emitted byte is not `{`.
    #[error("report does not start with '{{' (found {found:#04x})")]
    BadStart {
        /// The byte found.
        found: u8,
    },

    /// The chunk completing the report does not end with a newline.
    #[error("report does not end with a newline (found {found:#04x})")]
    BadEnd {
        /// The byte found.
        found: u8,
    },

    /// The window holds more bytes than the report needs.
    #[error("trailing data after report")]
    TrailingData,

    /// The window ran out before the report was complete.
    #[error("report size mismatch: expected {expected} bytes, emitted {emitted}")]
    SizeMismatch {
        /// `report_size`.
        expected: u64,
        /// Bytes emitted before the source ran out.
        emitted: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn codec_io_is_a_fetch_failure() {
        let e: ArchiveError =
            CodecError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset")).into();
        assert!(matches!(e, ArchiveError::Fetch(FetchError::Io(_))));
    }

    #[test]
    fn codec_timeout_is_retryable() {
        let e: ArchiveError =
            CodecError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow")).into();
        assert!(matches!(e, ArchiveError::Fetch(FetchError::Timeout)));
        assert!(e.is_retryable());
    }

    #[test]
    fn codec_corruption_is_a_decode_failure() {
        let e: ArchiveError = CodecError::BadMagic { found: 0 }.into();
        assert!(matches!(e, ArchiveError::Decode(DecodeError::Frame(_))));
        assert!(!e.is_retryable());
    }

    #[test]
    fn not_found_helper() {
        let e = ArchiveError::not_found("temp-id-1");
        assert!(e.is_not_found());
        assert_eq!(e.to_string(), "not found: temp-id-1");
    }

    #[test]
    fn malformed_display() {
        let e: ArchiveError = MalformedRecord::Start { found: b'x' }.into();
        assert_eq!(
            e.to_string(),
            "decode error: malformed record: first byte 0x78, expected '{'"
        );
    }
}
