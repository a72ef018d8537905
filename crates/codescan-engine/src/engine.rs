// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The decoding engine contract.

use codescan_core::error::Result;
use image::GrayImage;

/// A stateful barcode decoder session.
///
/// A handle is used by one caller at a time (`&mut self`); it may be moved
/// between threads but is never shared. Handles are released with
/// [`DecodeEngine::close`] rather than simply dropped.
pub trait DecodeEngine: Send + 'static {
    /// Find every symbol in `image` and return their payloads in the order the
    /// engine reports them.
    ///
    /// "No symbol found" is `Ok` with an empty list; `Err` is reserved for
    /// internal engine failures.
    fn decode(&mut self, image: &GrayImage) -> Result<Vec<String>>;

    /// Release the engine's resources.
    fn close(self)
    where
        Self: Sized,
    {
    }
}
