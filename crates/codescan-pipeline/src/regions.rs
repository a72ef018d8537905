// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coarse-to-fine candidate regions for the pyramid search.

use std::iter::FusedIterator;

use codescan_core::Region;

/// Candidate regions of `bounds`, largest first.
///
/// The first item is always `bounds` itself. Then, for tile sizes of half,
/// a quarter, an eighth ... of the page, while both tile dimensions are at
/// least `min_tile`, the page is tiled left to right and top to bottom and
/// every tile is yielded grown by a quarter of the tile size on each side,
/// clamped to `bounds`. Only whole tiles are visited.
///
/// The sequence depends on nothing but its arguments; clone the iterator or
/// call again to restart it.
pub fn regions(bounds: Region, min_tile: u32) -> Regions {
    Regions {
        bounds,
        min_tile: min_tile.max(1),
        started: false,
        tile_width: bounds.width / 2,
        tile_height: bounds.height / 2,
        x: 0,
        y: 0,
    }
}

/// Iterator returned by [`regions`].
#[derive(Debug, Clone)]
pub struct Regions {
    bounds: Region,
    min_tile: u32,
    started: bool,
    tile_width: u32,
    tile_height: u32,
    // Top-left of the next tile, relative to `bounds`.
    x: u32,
    y: u32,
}

impl Regions {
    /// Tile at (`x`, `y`) with its overlap padding, in page coordinates.
    fn padded(&self, x: u32, y: u32) -> Region {
        let (w, h) = (self.tile_width, self.tile_height);
        let (pad_x, pad_y) = (w / 4, h / 4);
        let min_x = x.saturating_sub(pad_x);
        let min_y = y.saturating_sub(pad_y);
        let max_x = (x + w + pad_x).min(self.bounds.width);
        let max_y = (y + h + pad_y).min(self.bounds.height);
        Region::from_corners(
            self.bounds.x + min_x,
            self.bounds.y + min_y,
            self.bounds.x + max_x,
            self.bounds.y + max_y,
        )
    }

    fn tier_exhausted(&self) -> bool {
        self.tile_width < self.min_tile || self.tile_height < self.min_tile
    }
}

impl Iterator for Regions {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        if !self.started {
            self.started = true;
            return Some(self.bounds);
        }
        loop {
            if self.tier_exhausted() {
                return None;
            }
            if self.y + self.tile_height > self.bounds.height {
                self.tile_width /= 2;
                self.tile_height /= 2;
                self.x = 0;
                self.y = 0;
                continue;
            }
            if self.x + self.tile_width > self.bounds.width {
                self.x = 0;
                self.y += self.tile_height;
                continue;
            }
            let region = self.padded(self.x, self.y);
            self.x += self.tile_width;
            return Some(region);
        }
    }
}

impl FusedIterator for Regions {}
