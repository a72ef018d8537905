// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObject unpacking: turn an image stream into something the image
// codec can read, or into decoded samples directly.

use codescan_core::error::{CodescanError, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::warn;

use crate::page::PixelSource;

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_HOPS: usize = 8;

/// Follow indirect references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_REFERENCE_HOPS {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

/// The `/Subtype` name of an XObject dictionary.
pub fn subtype(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Subtype") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

/// Sample layout of a raw image stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorModel {
    fn components(self) -> usize {
        match self {
            ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }
}

/// Unpack an image XObject.
///
/// Returns `Ok(None)` for encodings this reader does not handle (JBIG2, JPX,
/// CCITT, indexed colour, stencil masks); those images are skipped. A missing
/// or inconsistent dimension, or truncated sample data, is a `PdfError`.
pub fn decode_image(doc: &Document, stream: &Stream) -> Result<Option<PixelSource>> {
    let dict = &stream.dict;
    let width = positive_int(doc, dict, b"Width")?;
    let height = positive_int(doc, dict, b"Height")?;

    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        warn!("Skipping stencil mask image");
        return Ok(None);
    }

    let filters = filter_names(doc, dict);
    let samples = match filters.as_slice() {
        [] => stream.content.clone(),
        [only] if only.as_slice() == b"DCTDecode" => {
            return Ok(Some(PixelSource::Encoded(stream.content.clone())));
        }
        [only] if only.as_slice() == b"FlateDecode" => {
            stream.decompressed_content().map_err(|err| {
                CodescanError::PdfError(format!("failed to inflate image data: {}", err))
            })?
        }
        other => {
            let names: Vec<String> = other
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            warn!(filters = ?names, "Skipping image with unsupported encoding");
            return Ok(None);
        }
    };

    let Some(model) = color_model(doc, dict) else {
        warn!("Skipping image with unsupported colour space");
        return Ok(None);
    };
    let bits = match dict.get(b"BitsPerComponent").ok().and_then(|b| resolve(doc, b)) {
        Some(Object::Integer(bits)) => *bits,
        _ => 8,
    };

    let image = match (model, bits) {
        (ColorModel::Gray, 1) => {
            unpack_bilevel(&samples, width, height, inverted_decode(doc, dict))?
        }
        (_, 8) => unpack_8bit(&samples, width, height, model)?,
        (model, bits) => {
            warn!(?model, bits, "Skipping image with unsupported bit depth");
            return Ok(None);
        }
    };
    Ok(Some(PixelSource::Decoded(image)))
}

fn positive_int(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32> {
    let label = String::from_utf8_lossy(key);
    match dict.get(key).ok().and_then(|v| resolve(doc, v)) {
        Some(Object::Integer(value)) if *value > 0 && *value <= u32::MAX as i64 => {
            Ok(*value as u32)
        }
        Some(other) => Err(CodescanError::PdfError(format!(
            "invalid /{}: {:?}",
            label, other
        ))),
        None => Err(CodescanError::PdfError(format!("missing /{}", label))),
    }
}

/// `/Filter` as a list of names, whether given as a name or an array.
fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().and_then(|f| resolve(doc, f)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match resolve(doc, item) {
                Some(Object::Name(name)) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn color_model(doc: &Document, dict: &Dictionary) -> Option<ColorModel> {
    let space = match dict.get(b"ColorSpace").ok().and_then(|c| resolve(doc, c)) {
        Some(space) => space,
        // Without a colour space only 1-bit masks are meaningful; treat as grey.
        None => return Some(ColorModel::Gray),
    };
    match space {
        Object::Name(name) => model_from_name(name),
        Object::Array(items) => {
            let family = match items.first().and_then(|f| resolve(doc, f)) {
                Some(Object::Name(name)) => name.as_slice(),
                _ => return None,
            };
            match family {
                b"ICCBased" => {
                    let profile = match items.get(1).and_then(|p| resolve(doc, p)) {
                        Some(Object::Stream(profile)) => profile,
                        _ => return None,
                    };
                    match profile.dict.get(b"N") {
                        Ok(Object::Integer(1)) => Some(ColorModel::Gray),
                        Ok(Object::Integer(3)) => Some(ColorModel::Rgb),
                        Ok(Object::Integer(4)) => Some(ColorModel::Cmyk),
                        _ => None,
                    }
                }
                b"CalGray" => Some(ColorModel::Gray),
                b"CalRGB" => Some(ColorModel::Rgb),
                _ => None,
            }
        }
        _ => None,
    }
}

fn model_from_name(name: &[u8]) -> Option<ColorModel> {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => Some(ColorModel::Gray),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColorModel::Rgb),
        b"DeviceCMYK" | b"CMYK" => Some(ColorModel::Cmyk),
        _ => None,
    }
}

/// `/Decode [1 0]` flips the meaning of bilevel samples.
fn inverted_decode(doc: &Document, dict: &Dictionary) -> bool {
    match dict.get(b"Decode").ok().and_then(|d| resolve(doc, d)) {
        Some(Object::Array(items)) => {
            matches!(items.first(), Some(Object::Integer(1)))
                || matches!(items.first(), Some(Object::Real(v)) if *v >= 0.5)
        }
        _ => false,
    }
}

fn truncated(needed: usize, got: usize) -> CodescanError {
    CodescanError::PdfError(format!(
        "image data truncated: need {} bytes, got {}",
        needed, got
    ))
}

/// `a * b * c` bytes, or a `PdfError` when the declared geometry cannot be
/// addressed.
fn byte_len(width: u32, height: u32, a: usize, b: usize, c: usize) -> Result<usize> {
    a.checked_mul(b)
        .and_then(|n| n.checked_mul(c))
        .ok_or_else(|| CodescanError::PdfError(format!("image too large: {}x{}", width, height)))
}

/// Expand 1-bit samples (rows padded to whole bytes) to 8-bit grey.
/// A set bit is white unless the decode array is inverted.
fn unpack_bilevel(samples: &[u8], width: u32, height: u32, inverted: bool) -> Result<DynamicImage> {
    let row_bytes = (width as usize).div_ceil(8);
    let needed = byte_len(width, height, row_bytes, height as usize, 1)?;
    let pixel_count = byte_len(width, height, width as usize, height as usize, 1)?;
    if samples.len() < needed {
        return Err(truncated(needed, samples.len()));
    }

    let (set, clear) = if inverted { (0u8, 255u8) } else { (255u8, 0u8) };
    let mut pixels = Vec::with_capacity(pixel_count);
    for row in samples[..needed].chunks_exact(row_bytes) {
        for x in 0..width as usize {
            let bit = row[x / 8] >> (7 - (x % 8)) & 1;
            pixels.push(if bit == 1 { set } else { clear });
        }
    }
    GrayImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageLuma8)
        .ok_or_else(|| truncated(needed, samples.len()))
}

fn unpack_8bit(samples: &[u8], width: u32, height: u32, model: ColorModel) -> Result<DynamicImage> {
    let needed = byte_len(
        width,
        height,
        width as usize,
        height as usize,
        model.components(),
    )?;
    if samples.len() < needed {
        return Err(truncated(needed, samples.len()));
    }
    let samples = &samples[..needed];

    let image = match model {
        ColorModel::Gray => GrayImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageLuma8),
        ColorModel::Rgb => RgbImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageRgb8),
        ColorModel::Cmyk => {
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .flat_map(|px| {
                    let k = 255 - px[3] as u16;
                    [
                        ((255 - px[0] as u16) * k / 255) as u8,
                        ((255 - px[1] as u16) * k / 255) as u8,
                        ((255 - px[2] as u16) * k / 255) as u8,
                    ]
                })
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
    };
    image.ok_or_else(|| truncated(needed, samples.len()))
}
