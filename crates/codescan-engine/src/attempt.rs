// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A single decode attempt over one region of a page raster.

use codescan_core::Region;
use codescan_core::error::Result;
use codescan_document::raster;
use image::{GenericImageView, GrayImage};
use tracing::{debug, instrument};

use crate::engine::DecodeEngine;

/// Decode `region` of `image` with `engine`.
///
/// The full-page region is handed to the engine as is; any other region is
/// read through a borrowed view and copied into the contiguous buffer the
/// engine needs. An empty list means nothing was found. No retries happen
/// here.
#[instrument(skip_all, fields(region = %region))]
pub fn decode_region<E>(engine: &mut E, image: &GrayImage, region: Region) -> Result<Vec<String>>
where
    E: DecodeEngine + ?Sized,
{
    let (width, height) = image.dimensions();
    if region.covers(width, height) {
        return engine.decode(image);
    }

    let view = raster::view(image, region);
    if view.width() == 0 || view.height() == 0 {
        debug!("Region lies outside the raster, skipped");
        return Ok(Vec::new());
    }
    engine.decode(&raster::to_owned(&view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use codescan_core::CodescanError;
    use image::Luma;
    use std::sync::{Arc, Mutex};

    #[test]
    fn full_region_passes_page_through() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut engine = ScriptedEngine::new(move |img| {
            log.lock().unwrap().push(img.dimensions());
            Ok(vec!["A".into()])
        });
        let page = GrayImage::from_pixel(300, 200, Luma([255u8]));
        let codes = decode_region(&mut engine, &page, Region::full(300, 200)).unwrap();
        assert_eq!(codes, vec!["A".to_string()]);
        assert_eq!(*seen.lock().unwrap(), vec![(300, 200)]);
    }

    #[test]
    fn sub_region_is_cropped_and_clamped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut engine = ScriptedEngine::new(move |img| {
            log.lock().unwrap().push((img.dimensions(), img.get_pixel(0, 0).0[0]));
            Ok(Vec::new())
        });
        let mut page = GrayImage::from_pixel(300, 200, Luma([255u8]));
        page.put_pixel(250, 150, Luma([7u8]));
        let codes = decode_region(&mut engine, &page, Region::new(250, 150, 100, 100)).unwrap();
        assert!(codes.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![((50, 50), 7)]);
    }

    #[test]
    fn region_outside_raster_never_reaches_engine() {
        let mut engine = ScriptedEngine::silent();
        let page = GrayImage::from_pixel(100, 100, Luma([255u8]));
        let codes = decode_region(&mut engine, &page, Region::new(400, 400, 50, 50)).unwrap();
        assert!(codes.is_empty());
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn engine_failure_propagates() {
        let mut engine =
            ScriptedEngine::new(|_| Err(CodescanError::Engine("reader crashed".into())));
        let page = GrayImage::from_pixel(10, 10, Luma([0u8]));
        let err = decode_region(&mut engine, &page, Region::full(10, 10)).unwrap_err();
        assert!(matches!(err, CodescanError::Engine(_)));
    }
}
