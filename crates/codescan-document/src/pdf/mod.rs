// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: locating and unpacking the images embedded in each page.

pub mod reader;
pub mod xobject;

pub use reader::PdfReader;

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Whether `data` starts with the PDF signature.
pub fn has_pdf_signature(data: &[u8]) -> bool {
    data.starts_with(PDF_SIGNATURE)
}
