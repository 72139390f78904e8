//! LZ4 frame codec benchmarks.

use autoclave_bench::utils::{generate_archive, random_data};
use autoclave_codec::{decompress_frames, frame_index, Lz4FrameCodec};
use autoclave_testkit::compress;
use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio_util::codec::Decoder;

/// Benchmark buffered decompression of a single frame.
fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");

    for size in [1024, 64 * 1024, 1024 * 1024].iter() {
        let frame = compress(&random_data(*size));
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| {
                let out = decompress_frames(black_box(frame)).unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

/// Benchmark the streaming decoder over a multi-frame archive.
fn bench_stream_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_decode");

    for per_frame in [1, 16, 256].iter() {
        let archive = generate_archive(1024, *per_frame, 200);
        group.throughput(Throughput::Bytes(archive.data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(per_frame),
            &archive.data,
            |b, data| {
                b.iter(|| {
                    let mut codec = Lz4FrameCodec::new();
                    let mut buf = BytesMut::from(&data[..]);
                    let mut total = 0;
                    while let Some(chunk) = codec.decode(&mut buf).unwrap() {
                        total += chunk.len();
                    }
                    black_box(total);
                });
            },
        );
    }
    group.finish();
}

/// Benchmark frame indexing.
fn bench_frame_index(c: &mut Criterion) {
    let archive = generate_archive(4096, 8, 100);

    c.bench_function("frame_index", |b| {
        b.iter(|| {
            let index = frame_index(black_box(&archive.data)).unwrap();
            black_box(index);
        });
    });
}

criterion_group!(
    benches,
    bench_decompress,
    bench_stream_decode,
    bench_frame_index
);
criterion_main!(benches);
