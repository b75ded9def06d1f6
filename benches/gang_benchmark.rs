//! Gang benchmark: bulk ASCII ingestion vs the general path.
//!
//! Both sides ingest the same output, so the ratio is the speedup of the
//! bulk path.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use scrollcell::{CellString, GangToken, Screen};

fn log_output(lines: usize, width: usize) -> String {
    (0..lines)
        .map(|i| {
            let body = format!("[{i:06}] request handled status=200 ");
            let mut line = body.repeat(width / body.len() + 1);
            line.truncate(width);
            line + "\r\n"
        })
        .collect()
}

/// Benchmark: ingesting scrolling log output
fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for (width, height) in [(80, 24), (200, 50)] {
        let text = log_output(1000, width);
        let token = GangToken::from_ascii(text.clone()).unwrap();
        group.throughput(Throughput::Bytes(text.len() as u64));
        let size = format!("{width}x{height}");

        group.bench_with_input(BenchmarkId::new("gang", &size), &token, |b, token| {
            b.iter_batched(
                || Screen::new(width, height, 10_000).unwrap(),
                |mut screen| {
                    screen.append_mixed_ascii_gang(std::slice::from_ref(black_box(token)));
                    screen
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("naive", &size), &text, |b, text| {
            b.iter_batched(
                || Screen::new(width, height, 10_000).unwrap(),
                |mut screen| {
                    screen.append_string_at_cursor(black_box(text));
                    screen
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Benchmark: taking a snapshot of a full screen
fn bench_snapshot(c: &mut Criterion) {
    let mut screen = Screen::new(200, 50, 10_000).unwrap();
    let token = GangToken::from_ascii(log_output(5000, 200)).unwrap();
    screen.append_mixed_ascii_gang(&[token]);

    c.bench_function("screen_snapshot_200x50", |b| {
        b.iter(|| black_box(screen.snapshot()))
    });
    c.bench_function("line_encode_200", |b| {
        let line = screen.line(0).unwrap();
        b.iter(|| line.encode(black_box(0..200)))
    });
}

criterion_group!(benches, bench_ingest, bench_snapshot);
criterion_main!(benches);
