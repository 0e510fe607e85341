//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, BMP, WebP) | `image::load_from_memory` |
//! | Scale | `image::imageops::resize` (Lanczos3 by default) |
//! | Color adjustment | [`ColorMatrix::apply_in_place`](super::ColorMatrix::apply_in_place), one pass |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (RGB, composited over black) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless only) |

use super::backend::{BackendError, ImageBackend};
use super::params::{DrawParams, EncodeParams, RasterFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    filter: FilterType,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite over opaque black, the way a canvas exports transparency to JPEG.
fn flatten_on_black(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let over = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
        Rgb([over(r), over(g), over(b)])
    })
}

fn encode_failed(format: RasterFormat) -> impl Fn(image::ImageError) -> BackendError {
    move |e| BackendError::Encode(format!("{format:?} encode failed: {e}"))
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
        image::load_from_memory(bytes)
            .map(|img| img.to_rgba8())
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn draw(&self, source: &RgbaImage, params: &DrawParams) -> Result<RgbaImage, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Cannot draw into a {}x{} surface",
                params.width, params.height
            )));
        }
        let mut surface = if source.dimensions() == (params.width, params.height) {
            source.clone()
        } else {
            image::imageops::resize(source, params.width, params.height, self.filter)
        };
        params.adjustment.apply_in_place(&mut surface);
        Ok(surface)
    }

    fn encode(&self, image: &RgbaImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let (width, height) = image.dimensions();
        let mut buf = Vec::new();
        match params.format {
            RasterFormat::Jpeg => {
                let rgb = flatten_on_black(image);
                JpegEncoder::new_with_quality(&mut buf, params.quality.percent())
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(encode_failed(params.format))?;
            }
            RasterFormat::Png => {
                PngEncoder::new(&mut buf)
                    .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(encode_failed(params.format))?;
            }
            RasterFormat::WebP => {
                WebPEncoder::new_lossless(&mut buf)
                    .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(encode_failed(params.format))?;
            }
        }
        Ok(buf)
    }
}
