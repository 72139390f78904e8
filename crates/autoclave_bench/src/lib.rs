//! Benchmark support for autoclave.

pub mod utils;
