// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: synthetic PDFs drawing image XObjects, and encoded rasters.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// Encode `image` in `format`.
pub fn encode(image: &GrayImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image.clone())
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

/// Raw 8-bit greyscale image XObject.
pub fn gray_xobject(image: &GrayImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width() as i64,
            "Height" => image.height() as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        image.as_raw().clone(),
    )
}

/// JPEG image XObject.
pub fn jpeg_xobject(image: &GrayImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width() as i64,
            "Height" => image.height() as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        encode(image, ImageFormat::Jpeg),
    )
}

/// Build a PDF whose pages each draw the given image XObjects.
pub fn build_pdf(pages: Vec<Vec<Stream>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for images in pages {
        let mut xobjects = Dictionary::new();
        let mut content = Vec::new();
        for (i, stream) in images.into_iter().enumerate() {
            let name = format!("Im{}", i + 1);
            let id = doc.add_object(stream);
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
            content.extend_from_slice(format!("q 100 0 0 100 0 0 cm /{} Do Q\n", name).as_bytes());
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}
