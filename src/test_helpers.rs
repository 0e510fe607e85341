//! Shared test utilities for the image-enhancer test suite.
//!
//! Synthetic pixel buffers and encoded fixtures, so tests never depend on
//! files checked into the repository.

use image::{Rgba, RgbaImage};
use std::time::{Duration, Instant};

// =========================================================================
// Pixel buffers
// =========================================================================

/// Smooth RGB gradient, fully opaque.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// Deterministic pseudo-random RGBA noise (xorshift64), alpha included.
pub fn noise_image(width: u32, height: u32, seed: u64) -> RgbaImage {
    let mut state = seed | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    RgbaImage::from_fn(width, height, |_, _| {
        let v = next().to_le_bytes();
        Rgba([v[0], v[1], v[2], v[3]])
    })
}

/// PNG bytes of a gradient image.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::ImageEncoder;
    let img = gradient_image(width, height);
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

// =========================================================================
// Time
// =========================================================================

/// A fixed origin plus a millisecond offset, for driving the scheduler.
pub struct TestClock {
    origin: Instant,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn at(&self, ms: u64) -> Instant {
        self.origin + Duration::from_millis(ms)
    }
}
