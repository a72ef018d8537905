// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Production decoding engine backed by `rxing`, a pure-Rust port of the ZXing
// multi-format barcode reader (1D symbologies, QR, Data Matrix, Aztec, PDF417).

use std::panic::{AssertUnwindSafe, catch_unwind};

use codescan_core::config::EngineConfig;
use codescan_core::error::{CodescanError, Result};
use image::GrayImage;
use rxing::common::HybridBinarizer;
use rxing::multi::{GenericMultipleBarcodeReader, MultipleBarcodeReader};
use rxing::{
    BinaryBitmap, DecodeHintType, DecodeHintValue, DecodingHintDictionary, Exceptions,
    Luma8LuminanceSource, MultiUseMultiFormatReader,
};
use tracing::{debug, instrument};

use crate::engine::DecodeEngine;

/// A multi-symbol reader session.
///
/// rxing's readers and hint tables are not `Send`, so the session keeps only
/// its settings and builds the reader on each call.
#[derive(Debug, Clone)]
pub struct RxingEngine {
    try_harder: bool,
    decodes: u64,
}

impl RxingEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            try_harder: config.try_harder,
            decodes: 0,
        }
    }

    /// Number of bitmaps this session has decoded.
    pub fn decodes(&self) -> u64 {
        self.decodes
    }

    fn hints(&self) -> DecodingHintDictionary {
        let mut hints = DecodingHintDictionary::new();
        if self.try_harder {
            hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
        }
        hints
    }
}

impl Default for RxingEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl DecodeEngine for RxingEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn decode(&mut self, image: &GrayImage) -> Result<Vec<String>> {
        self.decodes += 1;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let hints = self.hints();
        let source = Luma8LuminanceSource::new(image.as_raw().clone(), width, height);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
            let mut reader = GenericMultipleBarcodeReader::new(MultiUseMultiFormatReader::default());
            reader.decode_multiple_with_hints(&mut bitmap, &hints)
        }))
        .map_err(|_| CodescanError::Engine("decoder panicked".to_string()))?;

        match outcome {
            Ok(symbols) => {
                let payloads: Vec<String> =
                    symbols.iter().map(|s| s.getText().to_string()).collect();
                debug!(symbols = payloads.len(), "Symbols decoded");
                Ok(payloads)
            }
            Err(err) if is_no_symbol(&err) => Ok(Vec::new()),
            Err(err) => Err(CodescanError::Engine(err.to_string())),
        }
    }
}

/// Rejections that mean "nothing readable here" rather than a broken engine.
fn is_no_symbol(err: &Exceptions) -> bool {
    matches!(
        err,
        Exceptions::NotFoundException(_)
            | Exceptions::ChecksumException(_)
            | Exceptions::FormatException(_)
            | Exceptions::ReedSolomonException(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{code39, on_page};
    use image::Luma;

    #[test]
    fn blank_bitmap_has_no_symbols() {
        let mut engine = RxingEngine::default();
        let blank = GrayImage::from_pixel(400, 300, Luma([255u8]));
        assert_eq!(engine.decode(&blank).unwrap(), Vec::<String>::new());
        assert_eq!(engine.decodes(), 1);
    }

    #[test]
    fn reads_code39_payload() {
        let mut engine = RxingEngine::default();
        let page = on_page(&code39("ABC123", 4, 160), 1000, 600, 100, 220);
        assert_eq!(engine.decode(&page).unwrap(), vec!["ABC123".to_string()]);
    }

    #[test]
    fn zero_sized_bitmap_is_empty() {
        let mut engine = RxingEngine::default();
        assert!(engine.decode(&GrayImage::new(0, 0)).unwrap().is_empty());
    }
}
