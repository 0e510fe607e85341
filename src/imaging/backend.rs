//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the pipeline needs
//! from a pixel library: decode, draw (scale + color adjustment), and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use a recording mock so pipeline logic can be checked without
//! real codecs.

use super::params::{DrawParams, EncodeParams};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the session is
/// backend-agnostic.
pub trait ImageBackend {
    /// Decode an encoded image into RGBA8.
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError>;

    /// Draw `source` scaled to the target size with the color adjustment
    /// applied, producing a fresh buffer.
    fn draw(&self, source: &RgbaImage, params: &DrawParams) -> Result<RgbaImage, BackendError>;

    /// Encode a buffer as a raster image.
    fn encode(&self, image: &RgbaImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}

impl<B: ImageBackend + ?Sized> ImageBackend for &B {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
        (**self).decode(bytes)
    }

    fn draw(&self, source: &RgbaImage, params: &DrawParams) -> Result<RgbaImage, BackendError> {
        (**self).draw(source, params)
    }

    fn encode(&self, image: &RgbaImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        (**self).encode(image, params)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{Quality, RasterFormat};
    use crate::imaging::ColorMatrix;
    use std::cell::RefCell;

    /// Mock backend that records operations instead of running codecs.
    ///
    /// `decode` pops queued dimensions and returns a flat gray buffer of that
    /// size; `draw` returns a flat buffer at the target size; `encode` returns
    /// a short tagged payload. The session is single-threaded, so `RefCell`
    /// is enough.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: RefCell<Vec<Dimensions>>,
        pub fail_encode: bool,
        pub operations: RefCell<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode { len: usize },
        Draw {
            source: (u32, u32),
            width: u32,
            height: u32,
            adjustment: ColorMatrix,
        },
        Encode {
            size: (u32, u32),
            format: RasterFormat,
            quality: u8,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                decode_results: RefCell::new(dims),
                ..Self::default()
            }
        }

        pub fn failing_encode() -> Self {
            Self {
                fail_encode: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.borrow().clone()
        }

        pub fn draw_count(&self) -> usize {
            self.operations
                .borrow()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Draw { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
            self.operations
                .borrow_mut()
                .push(RecordedOp::Decode { len: bytes.len() });

            let dims = self
                .decode_results
                .borrow_mut()
                .pop()
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))?;
            Ok(RgbaImage::from_pixel(
                dims.width,
                dims.height,
                image::Rgba([128, 128, 128, 255]),
            ))
        }

        fn draw(&self, source: &RgbaImage, params: &DrawParams) -> Result<RgbaImage, BackendError> {
            self.operations.borrow_mut().push(RecordedOp::Draw {
                source: source.dimensions(),
                width: params.width,
                height: params.height,
                adjustment: params.adjustment,
            });
            let mut out =
                RgbaImage::from_pixel(params.width, params.height, image::Rgba([128, 128, 128, 255]));
            params.adjustment.apply_in_place(&mut out);
            Ok(out)
        }

        fn encode(&self, image: &RgbaImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
            self.operations.borrow_mut().push(RecordedOp::Encode {
                size: image.dimensions(),
                format: params.format,
                quality: params.quality.percent(),
            });
            if self.fail_encode {
                return Err(BackendError::Encode("mock encoder refused".to_string()));
            }
            Ok(format!("{:?}", params.format).into_bytes())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let img = backend.decode(b"fake").unwrap();
        assert_eq!(img.dimensions(), (800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Decode { len: 4 }]);
    }

    #[test]
    fn mock_decode_without_dimensions_errors() {
        let backend = MockBackend::new();
        assert!(matches!(backend.decode(b"x"), Err(BackendError::Decode(_))));
    }

    #[test]
    fn mock_records_draw() {
        let backend = MockBackend::new();
        let source = RgbaImage::new(40, 30);
        let out = backend
            .draw(
                &source,
                &DrawParams {
                    width: 20,
                    height: 15,
                    adjustment: ColorMatrix::IDENTITY,
                },
            )
            .unwrap();
        assert_eq!(out.dimensions(), (20, 15));
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Draw {
                source: (40, 30),
                width: 20,
                height: 15,
                ..
            }
        ));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let bytes = backend
            .encode(
                &RgbaImage::new(4, 4),
                &EncodeParams {
                    format: RasterFormat::Jpeg,
                    quality: Quality::new(0.9),
                },
            )
            .unwrap();
        assert_eq!(bytes, b"Jpeg");
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Encode {
                format: RasterFormat::Jpeg,
                quality: 90,
                ..
            }
        ));
    }
}
