//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take a plan or configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::capped_dims;
use super::compositor::ColorMatrix;
use super::params::{DrawParams, EncodeParams, Quality, RasterFormat};
use super::tone::{Tone, apply_tone};
use image::RgbaImage;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Everything the base render needs, resolved from the filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub width: u32,
    pub height: u32,
    pub adjustment: ColorMatrix,
    pub tone: Tone,
}

/// Draw the source into a fresh surface: scale and color adjustment in one
/// backend pass, then the tone transform.
pub fn render_base(
    backend: &impl ImageBackend,
    source: &RgbaImage,
    plan: &RenderPlan,
) -> Result<RgbaImage> {
    let mut surface = backend.draw(
        source,
        &DrawParams {
            width: plan.width,
            height: plan.height,
            adjustment: plan.adjustment,
        },
    )?;
    apply_tone(&mut surface, plan.tone);
    Ok(surface)
}

/// Settings for normalizing an uploaded file.
#[derive(Debug, Clone, Copy)]
pub struct UploadConfig {
    pub max_dimension: u32,
    pub quality: Quality,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            quality: Quality::new(0.85),
        }
    }
}

/// An upload after downsampling and recompression.
#[derive(Debug)]
pub struct PreparedUpload {
    /// The recompressed file, kept as the image's backing blob.
    pub bytes: Vec<u8>,
    /// Decoded from `bytes`, so what the user edits is what was stored.
    pub pixels: RgbaImage,
}

/// Decode an upload, cap it at `config.max_dimension`, recompress it in
/// `format` and decode the result.
pub fn prepare_upload(
    backend: &impl ImageBackend,
    bytes: &[u8],
    format: RasterFormat,
    config: &UploadConfig,
) -> Result<PreparedUpload> {
    let original = backend.decode(bytes)?;
    let (src_w, src_h) = original.dimensions();
    let (width, height) = capped_dims(src_w, src_h, config.max_dimension);
    let (width, height) = (width.max(1), height.max(1));

    let resized = backend.draw(
        &original,
        &DrawParams {
            width,
            height,
            adjustment: ColorMatrix::IDENTITY,
        },
    )?;
    let recompressed = backend.encode(
        &resized,
        &EncodeParams {
            format,
            quality: config.quality,
        },
    )?;
    let pixels = backend.decode(&recompressed)?;
    Ok(PreparedUpload {
        bytes: recompressed,
        pixels,
    })
}
