// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open a document with `lopdf` and list the images each page
// draws, in page order.

use std::collections::HashSet;

use codescan_core::PageIndex;
use codescan_core::error::{CodescanError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use crate::page::PageImage;
use crate::pdf::xobject::{self, resolve};

/// Maximum depth of nested Form XObjects and page-tree ancestors followed.
const MAX_NESTING: usize = 16;

/// Reads the page images out of an existing PDF.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            CodescanError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        let catalog = document
            .catalog()
            .map_err(|err| CodescanError::PdfError(format!("no document catalog: {}", err)))?;
        if catalog.get(b"Pages").is_err() {
            return Err(CodescanError::UnsupportedDocument(
                "catalog has no page tree".to_string(),
            ));
        }

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Every image drawn by every page, in page order and, within a page, in
    /// resource dictionary order. A page may contribute no image at all.
    #[instrument(skip(self))]
    pub fn page_images(&self) -> Result<Vec<PageImage>> {
        let mut images = Vec::new();

        for (page_number, page_id) in self.document.get_pages() {
            let found = self.images_on_page(page_number, page_id)?;
            debug!(page = page_number, images = found.len(), "Page images located");
            images.extend(found);
        }

        info!(
            pages = self.page_count(),
            images = images.len(),
            "PDF page images extracted"
        );
        Ok(images)
    }

    fn images_on_page(&self, page: PageIndex, page_id: ObjectId) -> Result<Vec<PageImage>> {
        let page_dict = self.document.get_dictionary(page_id).map_err(|err| {
            CodescanError::PdfError(format!("cannot read page {}: {}", page, err))
        })?;

        let mut images = Vec::new();
        let mut seen = HashSet::new();
        if let Some(resources) = self.page_resources(page_dict) {
            self.collect_images(page, resources, &mut seen, &mut images, 0)?;
        }
        Ok(images)
    }

    /// The page's `/Resources`, inherited from the nearest ancestor that
    /// defines them when the page itself does not.
    fn page_resources<'a>(&'a self, page_dict: &'a Dictionary) -> Option<&'a Dictionary> {
        let mut node = page_dict;
        for _ in 0..MAX_NESTING {
            if let Ok(resources) = node.get(b"Resources") {
                return match resolve(&self.document, resources) {
                    Some(Object::Dictionary(dict)) => Some(dict),
                    _ => None,
                };
            }
            node = match node.get(b"Parent").ok().and_then(|p| resolve(&self.document, p)) {
                Some(Object::Dictionary(parent)) => parent,
                _ => return None,
            };
        }
        None
    }

    /// Walk a resource dictionary's `/XObject` entries, unpacking images and
    /// descending into Form XObjects.
    fn collect_images(
        &self,
        page: PageIndex,
        resources: &Dictionary,
        seen: &mut HashSet<ObjectId>,
        images: &mut Vec<PageImage>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_NESTING {
            warn!(page, "XObject nesting too deep; ignoring remainder");
            return Ok(());
        }
        let xobjects = match resources
            .get(b"XObject")
            .ok()
            .and_then(|x| resolve(&self.document, x))
        {
            Some(Object::Dictionary(dict)) => dict,
            _ => return Ok(()),
        };

        for (name, entry) in xobjects.iter() {
            if let Object::Reference(id) = entry {
                if !seen.insert(*id) {
                    continue;
                }
            }
            let stream = match resolve(&self.document, entry) {
                Some(Object::Stream(stream)) => stream,
                _ => {
                    warn!(page, name = %String::from_utf8_lossy(name), "XObject is not a stream");
                    continue;
                }
            };

            match xobject::subtype(&stream.dict) {
                Some(b"Image") => {
                    let label = String::from_utf8_lossy(name);
                    if let Some(source) = xobject::decode_image(&self.document, stream)
                        .map_err(|err| match err {
                            CodescanError::PdfError(msg) => CodescanError::PdfError(format!(
                                "page {} image /{}: {}",
                                page, label, msg
                            )),
                            other => other,
                        })?
                    {
                        images.push(PageImage::new(page, source));
                    }
                }
                Some(b"Form") => {
                    if let Some(Object::Dictionary(form_resources)) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|r| resolve(&self.document, r))
                    {
                        self.collect_images(page, form_resources, seen, images, depth + 1)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PixelSource;
    use crate::testing::{build_pdf, gray_xobject, jpeg_xobject};
    use image::{GrayImage, Luma};

    fn width_of(source: &PixelSource) -> u32 {
        source.to_luma().unwrap().width()
    }

    #[test]
    fn images_follow_page_and_resource_order() {
        let page1 = GrayImage::from_pixel(40, 30, Luma([10u8]));
        let page2a = GrayImage::from_pixel(50, 30, Luma([20u8]));
        let page2b = GrayImage::from_pixel(60, 30, Luma([30u8]));
        let pdf = build_pdf(vec![
            vec![gray_xobject(&page1)],
            vec![gray_xobject(&page2a), jpeg_xobject(&page2b)],
            vec![],
        ]);

        let reader = PdfReader::from_bytes(&pdf).unwrap();
        assert_eq!(reader.page_count(), 3);

        let images = reader.page_images().unwrap();
        let summary: Vec<(PageIndex, u32)> = images
            .iter()
            .map(|img| (img.page, width_of(&img.source)))
            .collect();
        assert_eq!(summary, vec![(1, 40), (2, 50), (2, 60)]);
    }

    #[test]
    fn raw_samples_survive_extraction() {
        let mut image = GrayImage::from_pixel(8, 4, Luma([255u8]));
        image.put_pixel(3, 1, Luma([0u8]));
        let pdf = build_pdf(vec![vec![gray_xobject(&image)]]);

        let images = PdfReader::from_bytes(&pdf).unwrap().page_images().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].source.to_luma().unwrap(), image);
    }

    #[test]
    fn truncated_file_is_pdf_error() {
        let result = PdfReader::from_bytes(b"%PDF-1.4\n%garbage without objects");
        assert!(matches!(result, Err(CodescanError::PdfError(_))));
    }

    #[test]
    fn catalog_without_pages_is_unsupported() {
        let mut doc = Document::with_version("1.5");
        let catalog_id = doc.add_object(lopdf::dictionary! { "Type" => "Catalog" });
        doc.trailer.set("Root", catalog_id);
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).unwrap();

        let result = PdfReader::from_bytes(&pdf);
        assert!(matches!(result, Err(CodescanError::UnsupportedDocument(_))));
    }
}
