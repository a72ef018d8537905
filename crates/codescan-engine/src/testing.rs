// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: synthetic Code 39 symbols and a scripted engine whose
// answers and call counts are under the test's control.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use codescan_core::error::Result;
use image::{GrayImage, Luma, imageops};

use crate::engine::DecodeEngine;

/// Code 39 element widths (bar, space, bar, ...), `w` wide and `n` narrow.
const CODE39: &[(char, &str)] = &[
    ('0', "nnnwwnwnn"),
    ('1', "wnnwnnnnw"),
    ('2', "nnwwnnnnw"),
    ('3', "wnwwnnnnn"),
    ('4', "nnnwwnnnw"),
    ('5', "wnnwwnnnn"),
    ('6', "nnwwwnnnn"),
    ('7', "nnnwnnwnw"),
    ('8', "wnnwnnwnn"),
    ('9', "nnwwnnwnn"),
    ('A', "wnnnnwnnw"),
    ('B', "nnwnnwnnw"),
    ('C', "wnwnnwnnn"),
    ('D', "nnnnwwnnw"),
    ('E', "wnnnwwnnn"),
    ('F', "nnwnwwnnn"),
    ('*', "nwnnwnwnn"),
];

/// Render `payload` (digits and `A`-`F`) as a Code 39 symbol with start/stop
/// characters and a quiet zone of twenty narrow modules on each side.
///
/// Panics on characters outside the table.
pub fn code39(payload: &str, narrow: u32, height: u32) -> GrayImage {
    let wide = narrow * 5 / 2;
    let quiet = narrow * 20;
    let framed: Vec<char> = std::iter::once('*')
        .chain(payload.chars())
        .chain(std::iter::once('*'))
        .collect();

    let mut runs: Vec<(bool, u32)> = Vec::new();
    for (i, ch) in framed.iter().enumerate() {
        let pattern = CODE39
            .iter()
            .find(|(c, _)| c == ch)
            .map(|(_, p)| *p)
            .unwrap_or_else(|| panic!("no Code 39 pattern for {:?}", ch));
        for (j, element) in pattern.chars().enumerate() {
            let bar = j % 2 == 0;
            let width = if element == 'w' { wide } else { narrow };
            runs.push((bar, width));
        }
        if i + 1 < framed.len() {
            runs.push((false, narrow));
        }
    }

    let symbol_width: u32 = runs.iter().map(|(_, w)| *w).sum();
    let mut image = GrayImage::from_pixel(symbol_width + 2 * quiet, height, Luma([255u8]));
    let mut x = quiet;
    for (bar, width) in runs {
        if bar {
            for dx in x..x + width {
                for y in 0..height {
                    image.put_pixel(dx, y, Luma([0u8]));
                }
            }
        }
        x += width;
    }
    image
}

/// Paste `symbol` onto a white `width` x `height` page at (`x`, `y`).
pub fn on_page(symbol: &GrayImage, width: u32, height: u32, x: i64, y: i64) -> GrayImage {
    let mut page = GrayImage::from_pixel(width, height, Luma([255u8]));
    imageops::overlay(&mut page, symbol, x, y);
    page
}

type Script = dyn Fn(&GrayImage) -> Result<Vec<String>> + Send + Sync;

/// Engine whose answers come from a closure, counting every call.
#[derive(Clone)]
pub struct ScriptedEngine {
    script: Arc<Script>,
    calls: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(script: impl Fn(&GrayImage) -> Result<Vec<String>> + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Engine that never finds anything.
    pub fn silent() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    /// Decode calls made through this engine and all its clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Engines of this family that have been closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl DecodeEngine for ScriptedEngine {
    fn decode(&mut self, image: &GrayImage) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(image)
    }

    fn close(self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
