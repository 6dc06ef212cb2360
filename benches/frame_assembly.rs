use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_mjpeg_http::capture::{CaptureError, FrameSegment, FrameSource};
use rust_mjpeg_http::frame::{assemble_frame, FrameBuffer};
use rust_mjpeg_http::http::{render_part_header, DELIMITER};
use rust_mjpeg_http::stream::write_fully;

const SEGMENT_LEN: usize = 4096;

fn create_test_jpeg(size: usize) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8]; // SOI
    jpeg.extend((0..size).map(|i| (i % 256) as u8));
    jpeg.extend(&[0xFF, 0xD9]); // EOI
    jpeg
}

/// Replays one frame's segments in a loop, wrapping at frame boundaries
struct LoopingSource {
    frame: Vec<u8>,
    offset: usize,
}

impl FrameSource for LoopingSource {
    fn dequeue(&mut self) -> Result<FrameSegment, CaptureError> {
        let end = (self.offset + SEGMENT_LEN).min(self.frame.len());
        let chunk = &self.frame[self.offset..end];
        let segment = FrameSegment::new(BytesMut::from(chunk), self.frame.len(), 0);

        self.offset = if end == self.frame.len() { 0 } else { end };
        Ok(segment)
    }

    fn recycle(&mut self, _segment: FrameSegment) {}

    fn max_frame_len(&self) -> usize {
        120_000
    }
}

fn benchmark_assemble_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_frame");

    // Typical webcam frame sizes
    for size in [5_000, 20_000, 50_000, 100_000].iter() {
        let mut source = LoopingSource {
            frame: create_test_jpeg(*size),
            offset: 0,
        };
        let mut buffer = FrameBuffer::with_capacity(120_000);

        group.bench_with_input(BenchmarkId::new("frame_size", size), size, |b, _| {
            b.iter(|| {
                assemble_frame(black_box(&mut source), &mut buffer).unwrap();
                black_box(buffer.len())
            });
        });
    }

    group.finish();
}

fn benchmark_part_emission(c: &mut Criterion) {
    let frame = create_test_jpeg(20_000);
    let header = render_part_header(frame.len());
    let mut out: Vec<u8> = Vec::with_capacity(frame.len() + 256);

    c.bench_function("emit_part_20k", |b| {
        b.iter(|| {
            out.clear();
            write_fully(&mut out, header.as_bytes()).unwrap();
            write_fully(&mut out, black_box(&frame)).unwrap();
            write_fully(&mut out, DELIMITER.as_bytes()).unwrap();
            black_box(out.len())
        });
    });
}

criterion_group!(benches, benchmark_assemble_frame, benchmark_part_emission);
criterion_main!(benches);
