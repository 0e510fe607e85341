//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the session (which decides what to render and export)
//! and the [`backend`](super::backend) (which does the actual pixel work).
//! This separation allows swapping backends (e.g. for testing with a mock)
//! without changing pipeline logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality as a fraction in (0, 1], default 0.85.
//! - [`RasterFormat`]: The raster encodings a backend must produce.
//! - [`DrawParams`]: Target dimensions plus the color adjustment for one draw.
//! - [`EncodeParams`]: Raster format plus quality for one encode.

use super::compositor::ColorMatrix;

/// Quality setting for lossy encoding, stored as a fraction in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality(f32);

impl Quality {
    pub const MIN: f32 = 0.01;

    /// Clamp into `[0.01, 1.0]`. Non-finite input falls back to the default.
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(Self::MIN, 1.0))
        } else {
            Self::default()
        }
    }

    pub fn fraction(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale encoders expect.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.85)
    }
}

/// Raster encodings every backend must support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    /// Lossy; quality applies, alpha is dropped.
    Jpeg,
    /// Lossless.
    Png,
    /// Lossless (the pure-Rust encoder has no lossy mode).
    WebP,
}

impl RasterFormat {
    pub fn is_lossy(self) -> bool {
        matches!(self, RasterFormat::Jpeg)
    }
}

/// Parameters for drawing the source into a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawParams {
    pub width: u32,
    pub height: u32,
    pub adjustment: ColorMatrix,
}

/// Parameters for a raster encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub format: RasterFormat,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0.0).fraction(), Quality::MIN);
        assert_eq!(Quality::new(0.5).fraction(), 0.5);
        assert_eq!(Quality::new(1.5).fraction(), 1.0);
    }

    #[test]
    fn quality_default_is_085() {
        assert_eq!(Quality::default().fraction(), 0.85);
        assert_eq!(Quality::default().percent(), 85);
    }

    #[test]
    fn quality_nan_uses_default() {
        assert_eq!(Quality::new(f32::NAN), Quality::default());
    }

    #[test]
    fn quality_percent_never_zero() {
        assert_eq!(Quality::new(0.001).percent(), 1);
        assert_eq!(Quality::new(1.0).percent(), 100);
    }

    #[test]
    fn only_jpeg_is_lossy() {
        assert!(RasterFormat::Jpeg.is_lossy());
        assert!(!RasterFormat::Png.is_lossy());
        assert!(!RasterFormat::WebP.is_lossy());
    }
}
