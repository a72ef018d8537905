// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the page-level treatments in codescan-document:
// the blank-page probe on a full scan and on a small region view, and the
// decode of a standalone page image to luminance.

use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use codescan_core::Region;
use codescan_document::{extract_pages, is_empty, raster};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// An A4 page at 300 dpi with a dark block near the top-left corner.
fn a4_page() -> GrayImage {
    let mut page = GrayImage::from_pixel(2480, 3508, Luma([250u8]));
    for y in 200..700 {
        for x in 200..1200 {
            page.put_pixel(x, y, Luma([10u8]));
        }
    }
    page
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_emptiness_probe(c: &mut Criterion) {
    let page = a4_page();
    c.bench_function("is_empty (A4 @ 300 dpi)", |b| {
        b.iter(|| black_box(is_empty(black_box(&page))));
    });

    let region = Region::new(1240, 1754, 620, 877);
    c.bench_function("is_empty (region view 620x877)", |b| {
        b.iter(|| {
            let view = raster::view(&page, region);
            black_box(is_empty(&*view))
        });
    });
}

fn bench_standalone_decode(c: &mut Criterion) {
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(a4_page())
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    c.bench_function("extract + to_luma (PNG A4)", |b| {
        b.iter(|| {
            let pages = extract_pages(black_box(png.clone())).unwrap();
            black_box(pages[0].source.to_luma().unwrap())
        });
    });
}

criterion_group!(benches, bench_emptiness_probe, bench_standalone_decode);
criterion_main!(benches);
