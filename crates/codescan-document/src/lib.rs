// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// codescan-document: document handling for the barcode scanner.
//
// Turns an input byte stream into page images (standalone rasters or the
// images embedded in PDF pages), decodes them to luminance, and provides the
// two cheap page-level treatments the scan pipeline relies on: the emptiness
// probe and the external cleanup pass.

pub mod fingerprint;
pub mod page;
pub mod pdf;
pub mod raster;
pub mod scan;
pub mod source;

pub use page::{PageImage, PixelSource};
pub use pdf::PdfReader;
pub use raster::RegionView;
pub use scan::cleanup::{ImageCleaner, UnpaperCleaner};
pub use scan::empty::is_empty;
pub use source::{DocumentKind, extract_pages};

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
