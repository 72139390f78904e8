//! # Autoclave Storage
//!
//! Byte-range fetchers for remote autoclaved archive files.
//!
//! This crate provides the lowest-level access to archive files. Fetchers are
//! **opaque byte stores** - they do not interpret the LZ4 frames or JSON
//! records they deliver.
//!
//! ## Design Principles
//!
//! - One request per fetched span (`Range: bytes=<off>-<off+len-1>`)
//! - Buffered fetches are length-checked against the requested range
//! - Streaming fetches expose the declared length and a lazy byte source
//! - Must be `Send + Sync` so a single fetcher serves concurrent requests
//!
//! ## Available Fetchers
//!
//! - [`HttpArchive`] - HTTP object store addressed by a base URL
//! - [`InMemoryArchive`] - For testing and benchmarks
//!
//! ## Example
//!
//! ```rust
//! use autoclave_storage::{ArchiveFile, ByteRange};
//!
//! let file = ArchiveFile::new("2017-07-08/http_header_field_manipulation.0.tar.lz4").unwrap();
//! let range = ByteRange::new(23274, 23638).unwrap();
//! assert_eq!(range.header_value(), "bytes=23274-46911");
//! assert_eq!(file.as_str(), "2017-07-08/http_header_field_manipulation.0.tar.lz4");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod body;
mod config;
mod error;
mod fetcher;
mod http;
mod memory;

pub use archive::{ArchiveFile, ByteRange};
pub use body::{ensure_exhausted, BodyReader, IdleTimeout, RangeBody};
pub use config::{HttpArchiveConfig, DEFAULT_BASE_URL};
pub use error::{FetchError, FetchResult};
pub use fetcher::RangeFetcher;
pub use http::HttpArchive;
pub use memory::InMemoryArchive;
