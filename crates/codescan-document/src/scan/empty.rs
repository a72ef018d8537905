// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Emptiness probe: decide cheaply whether a page or region carries any mark
// worth handing to the decoder.

use image::imageops::{self, FilterType};
use image::{GenericImageView, GrayImage, Luma};

/// Edge length of the downsampled probe grid.
pub const PROBE_SIZE: u32 = 16;

/// Samples strictly below this luminance count as dark.
pub const DARK_LEVEL: u8 = 128;

/// A probe with at most this many dark samples (of 256) is empty.
pub const MAX_DARK_SAMPLES: usize = 8;

/// Downsample `image` to a `PROBE_SIZE` x `PROBE_SIZE` luminance grid using a
/// bilinear (triangle) filter. The source is only read.
pub fn probe<I>(image: &I) -> GrayImage
where
    I: GenericImageView<Pixel = Luma<u8>>,
{
    imageops::resize(image, PROBE_SIZE, PROBE_SIZE, FilterType::Triangle)
}

/// Number of samples in `probe` darker than `DARK_LEVEL`.
pub fn count_dark(probe: &GrayImage) -> usize {
    probe.pixels().filter(|p| p.0[0] < DARK_LEVEL).count()
}

/// Whether `image` is blank: its probe has no more than `MAX_DARK_SAMPLES`
/// dark samples.
pub fn is_empty<I>(image: &I) -> bool
where
    I: GenericImageView<Pixel = Luma<u8>>,
{
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return true;
    }
    count_dark(&probe(image)) <= MAX_DARK_SAMPLES
}
