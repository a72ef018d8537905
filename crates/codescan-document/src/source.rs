// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input sniffing: decide whether a byte stream is a PDF or a standalone
// raster, and produce the page images to scan accordingly.

use codescan_core::error::Result;
use tracing::{debug, instrument};

use crate::page::PageImage;
use crate::pdf::{PdfReader, has_pdf_signature};

/// What an input byte stream holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A PDF; its embedded page images are scanned.
    Pdf,
    /// Anything else, scanned as one standalone image.
    Image,
}

impl DocumentKind {
    /// Classify `data` by its leading bytes.
    pub fn sniff(data: &[u8]) -> Self {
        if has_pdf_signature(data) {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }
}

/// The ordered page images of a document.
///
/// For a PDF these are the images each page draws, in page order; a page
/// without images contributes nothing. Any other input becomes one image on
/// page 1 (whether it actually decodes is only discovered when it is scanned).
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn extract_pages(data: Vec<u8>) -> Result<Vec<PageImage>> {
    let kind = DocumentKind::sniff(&data);
    debug!(?kind, "Input sniffed");
    match kind {
        DocumentKind::Pdf => PdfReader::from_bytes(&data)?.page_images(),
        DocumentKind::Image => Ok(vec![PageImage::standalone(data)]),
    }
}
