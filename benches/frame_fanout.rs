//! Benchmarks for the video broadcast path
//!
//! Covers:
//! - Publishing into the latest-frame buffer while readers copy it out
//! - Multipart unit construction per viewer
//! - JPEG encoding of a VGA frame (the capture loop's main cost)
//!
//! Platform: Cross-platform (synthetic frames, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use picar::camera::{FrameEncoder, JpegFrameEncoder, Orientation};
use picar::stream::{BroadcastBuffer, mjpeg};
use picar::types::RawImage;
use std::hint::black_box;

const JPEG_SIZE: usize = 40 * 1024;

fn bench_buffer(c: &mut Criterion) {
    let buffer = BroadcastBuffer::new();
    let jpeg = vec![0xAB; JPEG_SIZE];
    buffer.publish(jpeg.clone());

    let mut group = c.benchmark_group("broadcast_buffer");
    group.throughput(Throughput::Bytes(JPEG_SIZE as u64));

    group.bench_function("publish", |b| {
        b.iter(|| black_box(buffer.publish(black_box(jpeg.clone()))))
    });

    group.bench_function("read", |b| b.iter(|| black_box(buffer.read())));

    for viewers in [1usize, 4, 16] {
        group.bench_function(BenchmarkId::new("read_fanout", viewers), |b| {
            b.iter(|| {
                for _ in 0..viewers {
                    black_box(buffer.read());
                }
            })
        });
    }

    group.finish();
}

fn bench_multipart(c: &mut Criterion) {
    let jpeg = vec![0xCD; JPEG_SIZE];

    let mut group = c.benchmark_group("multipart");
    group.throughput(Throughput::Bytes(JPEG_SIZE as u64));
    group.bench_function("encode_part", |b| {
        b.iter(|| black_box(mjpeg::encode_part(black_box(&jpeg))))
    });
    group.finish();
}

fn bench_jpeg(c: &mut Criterion) {
    let image = RawImage::filled(640, 480, [40, 120, 200]);
    let mut group = c.benchmark_group("jpeg_encode");
    group.sample_size(20);

    for (label, orientation) in [
        ("identity", Orientation::default()),
        ("rotate_180", Orientation { rotation: 180, hflip: false, vflip: false }),
    ] {
        let encoder = JpegFrameEncoder::new(orientation);
        group.bench_function(BenchmarkId::new("vga_q80", label), |b| {
            b.iter(|| black_box(encoder.encode(black_box(&image), 80)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffer, bench_multipart, bench_jpeg);
criterion_main!(benches);
