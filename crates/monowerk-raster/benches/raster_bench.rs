// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bit-depth converters on a small synthetic
// gradient page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use monowerk_core::Resolution;
use monowerk_raster::buffer::{PixelBuffer, PixelLayout};
use monowerk_raster::convert;

/// A 640x480 Bgr24 page with a horizontal brightness gradient, so the
/// threshold converter sees both black and white runs.
fn gradient_page() -> PixelBuffer {
    let (width, height) = (640u32, 480u32);
    let mut buf = PixelBuffer::new(width, height, PixelLayout::Bgr24, Resolution::SCREEN);
    for y in 0..height {
        let row = buf.row_mut(y);
        for x in 0..width as usize {
            let value = (x * 255 / width as usize) as u8;
            row[x * 3..x * 3 + 3].copy_from_slice(&[value, value, value]);
        }
    }
    buf
}

fn bench_to_mono1(c: &mut Criterion) {
    let page = gradient_page();
    c.bench_function("to_mono1 (640x480)", |b| {
        b.iter(|| black_box(convert::to_mono1(black_box(&page)).unwrap()));
    });
}

fn bench_to_gray8(c: &mut Criterion) {
    let page = gradient_page();
    c.bench_function("to_gray8 (640x480)", |b| {
        b.iter(|| black_box(convert::to_gray8(black_box(&page)).unwrap()));
    });
}

criterion_group!(benches, bench_to_mono1, bench_to_gray8);
criterion_main!(benches);
