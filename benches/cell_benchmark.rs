//! Cell benchmark: comparison, construction and wire encoding.
//!
//! Target: < 1ns per comparison

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scrollcell::{Cell, Color, Rgb, Style};

fn cell_equality_same(c: &mut Criterion) {
    let cell_a = Cell::from_char('A')
        .with_fg(Color::Rgb(Rgb::new(255, 128, 64)))
        .with_bg(Color::Rgb(Rgb::new(32, 32, 32)))
        .with_style(Style::BOLD);
    let cell_b = cell_a;

    c.bench_function("cell_eq_same", |b| {
        b.iter(|| black_box(&cell_a) == black_box(&cell_b))
    });
}

fn cell_equality_different_code(c: &mut Criterion) {
    let cell_a = Cell::from_char('A');
    let cell_b = Cell::from_char('B');

    c.bench_function("cell_eq_diff_code", |b| {
        b.iter(|| black_box(&cell_a) == black_box(&cell_b))
    });
}

fn cell_equality_different_color(c: &mut Criterion) {
    let cell_a = Cell::from_char('A').with_fg(Color::Indexed(1));
    let cell_b = Cell::from_char('A').with_fg(Color::Indexed(2));

    c.bench_function("cell_eq_diff_color", |b| {
        b.iter(|| black_box(&cell_a) == black_box(&cell_b))
    });
}

fn cell_from_char(c: &mut Criterion) {
    c.bench_function("cell_from_char_ascii", |b| {
        b.iter(|| Cell::from_char(black_box('A')))
    });

    c.bench_function("cell_from_char_cjk", |b| {
        b.iter(|| Cell::from_char(black_box('日')))
    });

    c.bench_function("cell_from_grapheme_combining", |b| {
        b.iter(|| Cell::from_grapheme(black_box("e\u{301}")))
    });
}

fn cell_wire(c: &mut Criterion) {
    let cell = Cell::from_char('Z').with_bg(Color::Indexed(4));
    let bytes = cell.to_bytes();

    c.bench_function("cell_to_bytes", |b| b.iter(|| black_box(&cell).to_bytes()));
    c.bench_function("cell_from_bytes", |b| {
        b.iter(|| Cell::from_bytes(black_box(&bytes)))
    });
}

criterion_group!(
    benches,
    cell_equality_same,
    cell_equality_different_code,
    cell_equality_different_color,
    cell_from_char,
    cell_wire,
);
criterion_main!(benches);
