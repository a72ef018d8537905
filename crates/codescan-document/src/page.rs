// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page images: one raster to scan, tagged with the page it belongs to.

use codescan_core::error::{CodescanError, Result};
use codescan_core::{PageIndex, STANDALONE_PAGE};
use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::fingerprint::fingerprint;

/// Where a page image's pixels come from.
#[derive(Debug, Clone)]
pub enum PixelSource {
    /// An encoded raster stream (JPEG, PNG, ...) still to be decoded.
    Encoded(Vec<u8>),
    /// Samples already unpacked, e.g. raw image data from a PDF.
    Decoded(DynamicImage),
}

impl PixelSource {
    /// Run the image codec and return the decoded raster.
    pub fn decode(&self) -> Result<DynamicImage> {
        match self {
            PixelSource::Encoded(data) => image::load_from_memory(data).map_err(|err| {
                CodescanError::UnreadableImage(format!("failed to decode image: {}", err))
            }),
            PixelSource::Decoded(image) => Ok(image.clone()),
        }
    }

    /// Decode straight to 8-bit luminance.
    pub fn to_luma(&self) -> Result<GrayImage> {
        match self {
            PixelSource::Decoded(DynamicImage::ImageLuma8(gray)) => Ok(gray.clone()),
            PixelSource::Decoded(image) => Ok(image.to_luma8()),
            PixelSource::Encoded(_) => {
                let image = self.decode()?;
                debug!(
                    width = image.width(),
                    height = image.height(),
                    "Image decoded from bytes"
                );
                Ok(image.into_luma8())
            }
        }
    }

    /// Short digest of the underlying bytes.
    pub fn fingerprint(&self) -> String {
        match self {
            PixelSource::Encoded(data) => fingerprint(data),
            PixelSource::Decoded(image) => fingerprint(image.as_bytes()),
        }
    }
}

/// One raster to scan. Immutable once produced.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Page the image belongs to (1-based).
    pub page: PageIndex,
    pub source: PixelSource,
}

impl PageImage {
    pub fn new(page: PageIndex, source: PixelSource) -> Self {
        Self { page, source }
    }

    /// Wrap a standalone image file's bytes.
    pub fn standalone(data: Vec<u8>) -> Self {
        Self::new(STANDALONE_PAGE, PixelSource::Encoded(data))
    }
}
