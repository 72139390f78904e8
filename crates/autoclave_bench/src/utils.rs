//! Benchmark utilities.

use autoclave_testkit::{ArchiveBuilder, BuiltArchive};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a JSON record with a random payload of roughly `payload_size` bytes.
pub fn random_record(id: usize, payload_size: usize) -> Vec<u8> {
    let payload: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(payload_size)
        .map(char::from)
        .collect();
    format!(r#"{{"id":{id},"test_keys":{{"body":"{payload}"}}}}"#).into_bytes()
}

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Build an archive of `count` records, `per_frame` records to a frame.
pub fn generate_archive(count: usize, per_frame: usize, payload_size: usize) -> BuiltArchive {
    let mut builder = ArchiveBuilder::new("2017-07-08/bench.0.tar.lz4");
    for id in 0..count {
        builder = builder.record(&random_record(id, payload_size));
        if (id + 1) % per_frame.max(1) == 0 {
            builder = builder.frame();
        }
    }
    builder.build()
}

/// Single-threaded runtime for driving async benchmarks.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}
