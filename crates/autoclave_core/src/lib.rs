//! # Autoclave Core
//!
//! Record extraction and streaming report reconstruction from autoclaved
//! archive files.
//!
//! Measurements are stored packed and LZ4-compressed in large archive files.
//! An index records, for each measurement, where its frames start, how long
//! they are, and where the record sits in the decompressed bytes. This crate
//! turns those coordinates back into the original JSON bytes:
//!
//! - [`RecordExtractor`] fetches one frame span and slices out a record
//! - [`ReportReconstructor`] streams a whole report, frame by frame, with
//!   memory bounded by the largest frame
//! - [`ArchiveEngine`] ties a [`LocatorResolver`] to both
//!
//! Record bytes are never parsed; output is byte-for-byte what the archive
//! holds (plus the one newline the packer may have left out).
//!
//! ## Example
//!
//! ```rust
//! use autoclave_core::{ByteSlice, FrameSpan, RecordLocator, ReportWindow};
//! use autoclave_storage::ArchiveFile;
//!
//! let file = ArchiveFile::new("2017-07-08/web_connectivity.0.tar.lz4").unwrap();
//! let a = RecordLocator::new(
//!     file.clone(),
//!     FrameSpan { frame_off: 0, frame_size: 120 },
//!     ByteSlice { intra_off: 0, intra_size: 7 },
//! );
//! let b = RecordLocator::new(
//!     file,
//!     FrameSpan { frame_off: 120, frame_size: 80 },
//!     ByteSlice { intra_off: 0, intra_size: 5 },
//! );
//!
//! let window = ReportWindow::from_members(&[a, b]).unwrap();
//! assert_eq!(window.len(), 200);
//! assert_eq!(window.report_size(), 14);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod extract;
mod locator;
mod reconstruct;
mod resolver;

pub use config::EngineConfig;
pub use engine::ArchiveEngine;
pub use error::{ArchiveError, ArchiveResult, DecodeError, IntegrityError, MalformedRecord};
pub use extract::RecordExtractor;
pub use locator::{ByteSlice, FrameSpan, RecordLocator, ReportExtent, ReportWindow};
pub use reconstruct::{ReconstructionState, ReportReader, ReportReconstructor};
pub use resolver::{LocatorResolver, MemoryResolver};
