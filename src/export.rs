//! Encoding the render surface for download.
//!
//! Raster formats go straight through the backend. The document format
//! wraps a JPEG of the surface in a single-page PDF whose page is exactly
//! the surface size (1px = 1pt).

use crate::imaging::{BackendError, EncodeParams, ImageBackend, Quality, RasterFormat};
use crate::state::OutputFormat;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Nothing to encode: load an image first")]
    NothingToEncode,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Document assembly failed: {0}")]
    Document(String),
}

/// An encoded file, ready to save. Produced on demand and never cached.
#[derive(Debug, Clone)]
pub struct EncodedOutput {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub mime: &'static str,
    pub filename: String,
}

impl EncodedOutput {
    /// Write into `dir` under the suggested filename.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `image-<unix millis>.<ext>`
pub fn filename_for(format: OutputFormat, at: DateTime<Utc>) -> String {
    format!("image-{}.{}", at.timestamp_millis(), format.extension())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

/// Page geometry for a surface of `width × height` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub orientation: PageOrientation,
    /// Long and short edge in points.
    pub long_edge: u32,
    pub short_edge: u32,
}

impl PageLayout {
    pub fn for_surface(width: u32, height: u32) -> Self {
        let orientation = if width > height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };
        Self {
            orientation,
            long_edge: width.max(height),
            short_edge: width.min(height),
        }
    }

    /// `(width, height)` of the page in points.
    pub fn size(&self) -> (u32, u32) {
        match self.orientation {
            PageOrientation::Landscape => (self.long_edge, self.short_edge),
            PageOrientation::Portrait => (self.short_edge, self.long_edge),
        }
    }
}

fn document_error(e: impl std::fmt::Display) -> EncodeError {
    EncodeError::Document(e.to_string())
}

/// Build a one-page PDF showing `jpeg` (a `width × height` baseline JPEG)
/// across the whole page.
pub fn embed_in_document(jpeg: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    let layout = PageLayout::for_surface(width, height);
    let (page_w, page_h) = layout.size();
    let (page_w, page_h) = (i64::from(page_w), i64::from(page_h));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(width)),
            "Height" => Object::Integer(i64::from(height)),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(page_w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(page_h),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.encode().map_err(document_error)?,
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(page_w),
            Object::Integer(page_h),
        ],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(document_error)?;
    Ok(buf)
}

/// Encode `surface` in `format`.
///
/// `quality` applies to JPEG only. The document format embeds a JPEG at
/// `document_quality` regardless of `quality`.
pub fn encode_surface(
    backend: &impl ImageBackend,
    surface: &RgbaImage,
    format: OutputFormat,
    quality: Quality,
    document_quality: Quality,
    at: DateTime<Utc>,
) -> Result<EncodedOutput, EncodeError> {
    let (width, height) = surface.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::NothingToEncode);
    }

    let bytes = match format.raster() {
        Some(raster) => backend.encode(surface, &EncodeParams { format: raster, quality })?,
        None => {
            let jpeg = backend.encode(
                surface,
                &EncodeParams {
                    format: RasterFormat::Jpeg,
                    quality: document_quality,
                },
            )?;
            embed_in_document(jpeg, width, height)?
        }
    };

    let output = EncodedOutput {
        bytes,
        format,
        mime: format.mime_type(),
        filename: filename_for(format, at),
    };
    log::info!(
        "Encoded {}x{} surface as {} ({} bytes)",
        width,
        height,
        format,
        output.bytes.len()
    );
    Ok(output)
}
