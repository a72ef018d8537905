// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Codescan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 1-based page number inside a document.
pub type PageIndex = u32;

/// Page index under which a standalone (non-PDF) image is reported.
pub const STANDALONE_PAGE: PageIndex = 1;

/// Decoded payloads of one document, keyed by page.
///
/// A page's entry is the concatenation of every payload found on it, in the
/// order its images were extracted and its regions were attempted.
pub type PageCodes = BTreeMap<PageIndex, Vec<String>>;

/// Append `codes` to the entry for `page`, creating it if absent.
pub fn append_codes(pages: &mut PageCodes, page: PageIndex, codes: Vec<String>) {
    pages.entry(page).or_default().extend(codes);
}

/// Axis-aligned rectangle within a page's pixel bounds.
///
/// `x`/`y` are the top-left corner; the rectangle covers
/// `[x, x + width) x [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full bounds of a `width` x `height` page.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Build a region from its corner coordinates (`max` exclusive).
    pub fn from_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self::new(
            min_x,
            min_y,
            max_x.saturating_sub(min_x),
            max_y.saturating_sub(min_y),
        )
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `other` lies entirely inside this region.
    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether this region covers the whole of a `width` x `height` page.
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width >= width && self.height >= height
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.x,
            self.y,
            self.right(),
            self.bottom()
        )
    }
}
