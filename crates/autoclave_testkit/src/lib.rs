//! # Autoclave Testkit
//!
//! Test utilities for autoclave.
//!
//! This crate provides:
//! - [`ArchiveBuilder`] for packing records into LZ4 frames with known
//!   locators
//! - Property-based test generators using proptest
//! - [`RangeServer`], a local HTTP store answering `Range` requests
//! - [`PipeArchive`], a fetcher whose body the test writes by hand
//!
//! The cross-crate integration suites live in this crate's `tests/`
//! directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use autoclave_testkit::prelude::*;
//!
//! let archive = ArchiveBuilder::new("a.bin").record(br#"{"a":1}"#).build();
//! let engine = ArchiveEngine::new(std::sync::Arc::new(archive.store()), EngineConfig::default());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod pipe;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::pipe::*;
    pub use crate::server::*;
    pub use autoclave_core::{ArchiveEngine, EngineConfig};
}

pub use fixtures::*;
pub use generators::*;
pub use pipe::*;
pub use server::*;
