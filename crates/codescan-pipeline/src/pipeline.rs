// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page pipeline: the retry strategy for one page image.
//
// Blank pages are dropped after a cheap probe. A page whose unmodified raster
// decodes is done. Otherwise the page is cleaned once, and the cleaned raster
// is searched region by region, coarse to fine, stopping at the first region
// that yields anything. Not finding a code is a valid outcome; only engine
// and codec failures (and cancellation) end the run with an error.

use std::sync::Arc;

use codescan_core::error::{CodescanError, Result};
use codescan_core::{Region, ScanConfig};
use codescan_document::scan::cleanup::{ImageCleaner, UnpaperCleaner};
use codescan_document::{PageImage, is_empty, raster};
use codescan_engine::{DecodeEngine, decode_region};
use image::GrayImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::regions::regions;

/// Where a page run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The emptiness probe found nothing worth decoding.
    Empty,
    /// The unmodified page decoded.
    WholePage,
    /// A candidate region of the working image decoded.
    Region {
        /// Position in the candidate sequence (0 is the full working image).
        index: usize,
        region: Region,
    },
    /// Every candidate was tried without result.
    Exhausted,
}

/// Result of one page run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Payloads in the order the engine reported them. Empty unless `stage`
    /// is `WholePage` or `Region`.
    pub codes: Vec<String>,
    pub stage: Stage,
    /// Whether the cleanup pass produced the working image.
    pub cleaned: bool,
    /// Decode attempts made.
    pub attempts: usize,
}

impl PageOutcome {
    fn new(stage: Stage, codes: Vec<String>, cleaned: bool, attempts: usize) -> Self {
        Self {
            codes,
            stage,
            cleaned,
            attempts,
        }
    }
}

/// Runs the scanning strategy over single pages.
///
/// Holds no per-page state, so one pipeline serves every worker; the decoder
/// handle is passed in for the duration of a run.
#[derive(Clone)]
pub struct PagePipeline {
    cleaner: Arc<dyn ImageCleaner>,
    min_tile: u32,
}

impl PagePipeline {
    pub fn new(cleaner: Arc<dyn ImageCleaner>, min_tile: u32) -> Self {
        Self { cleaner, min_tile }
    }

    /// Pipeline with the `unpaper` cleaner and region floor from `config`.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            Arc::new(UnpaperCleaner::new(config.cleanup.clone())),
            config.min_tile,
        )
    }

    /// Decode `page` to luminance and scan it.
    #[instrument(skip_all, fields(page = page.page))]
    pub fn run<E>(
        &self,
        page: &PageImage,
        engine: &mut E,
        cancel: &CancellationToken,
    ) -> Result<PageOutcome>
    where
        E: DecodeEngine + ?Sized,
    {
        checkpoint(cancel)?;
        let image = page.source.to_luma()?;
        info!(
            fingerprint = %page.source.fingerprint(),
            width = image.width(),
            height = image.height(),
            "Scanning page image"
        );
        let outcome = self.scan(&image, engine, cancel)?;
        info!(
            stage = ?outcome.stage,
            codes = outcome.codes.len(),
            attempts = outcome.attempts,
            "Page image done"
        );
        Ok(outcome)
    }

    /// Scan a luminance raster.
    pub fn scan<E>(
        &self,
        image: &GrayImage,
        engine: &mut E,
        cancel: &CancellationToken,
    ) -> Result<PageOutcome>
    where
        E: DecodeEngine + ?Sized,
    {
        let bounds = raster::bounds(image);

        // -- Emptiness check --
        if is_empty(image) {
            debug!("Page is blank, skipped");
            return Ok(PageOutcome::new(Stage::Empty, Vec::new(), false, 0));
        }

        // -- Whole page --
        checkpoint(cancel)?;
        let codes = decode_region(engine, image, bounds)?;
        let mut attempts = 1;
        if !codes.is_empty() {
            return Ok(PageOutcome::new(Stage::WholePage, codes, false, attempts));
        }

        // -- Cleanup, once per page --
        checkpoint(cancel)?;
        let cleaned = self.cleanup(image, cancel);
        let is_cleaned = cleaned.is_some();
        let working = cleaned.as_ref().unwrap_or(image);

        // -- Region scan --
        for (index, region) in regions(raster::bounds(working), self.min_tile).enumerate() {
            // The uncleaned full page was already tried above.
            if index == 0 && !is_cleaned {
                continue;
            }
            checkpoint(cancel)?;
            let codes = decode_region(engine, working, region)?;
            attempts += 1;
            if !codes.is_empty() {
                debug!(index, %region, "Region decoded");
                return Ok(PageOutcome::new(
                    Stage::Region { index, region },
                    codes,
                    is_cleaned,
                    attempts,
                ));
            }
        }

        Ok(PageOutcome::new(Stage::Exhausted, Vec::new(), is_cleaned, attempts))
    }

    /// Best-effort cleanup. Failures are logged and yield `None`.
    fn cleanup(&self, image: &GrayImage, cancel: &CancellationToken) -> Option<GrayImage> {
        match self.cleaner.clean(image, cancel) {
            Ok(Some(cleaned)) => Some(cleaned),
            Ok(None) => {
                debug!("Cleanup unavailable, scanning the original image");
                None
            }
            Err(err) => {
                warn!(error = %err, "Cleanup failed, scanning the original image");
                None
            }
        }
    }
}

impl std::fmt::Debug for PagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagePipeline")
            .field("min_tile", &self.min_tile)
            .finish_non_exhaustive()
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(CodescanError::Cancelled);
    }
    Ok(())
}
