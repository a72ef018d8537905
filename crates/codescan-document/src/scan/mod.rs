// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-level treatments applied before decoding: the blank-page probe and the
// external deskew/despeckle pass.

pub mod cleanup;
pub mod empty;

pub use cleanup::{ImageCleaner, UnpaperCleaner};
pub use empty::is_empty;
