// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Luminance rasters and read-only region views over them.

use codescan_core::Region;
use image::{GrayImage, SubImage, imageops};

/// Borrowed, read-only window onto a page raster. No pixels are copied.
pub type RegionView<'a> = SubImage<&'a GrayImage>;

/// View `region` of `image`, clamped to the image bounds.
pub fn view(image: &GrayImage, region: Region) -> RegionView<'_> {
    imageops::crop_imm(image, region.x, region.y, region.width, region.height)
}

/// Full bounds of a raster.
pub fn bounds(image: &GrayImage) -> Region {
    let (width, height) = image.dimensions();
    Region::full(width, height)
}

/// Copy a view into a contiguous buffer, for consumers that need one.
pub fn to_owned(view: &RegionView<'_>) -> GrayImage {
    view.to_image()
}
