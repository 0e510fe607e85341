//! 3×3 unsharp-mask convolution.
//!
//! ```text
//!    0    -s     0
//!   -s   1+4s   -s
//!    0    -s     0
//! ```
//!
//! Applied to R, G and B independently. Alpha and the one-pixel border are
//! copied from the input unchanged. The pass reads only from the input buffer
//! and writes only to a fresh output buffer, so already-sharpened neighbours
//! never feed back into the sum.

use image::RgbaImage;

/// The kernel weights for a given strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpKernel {
    pub weights: [[f32; 3]; 3],
}

impl UnsharpKernel {
    pub fn new(strength: f32) -> Self {
        let s = strength;
        Self {
            weights: [
                [0.0, -s, 0.0],
                [-s, 1.0 + 4.0 * s, -s],
                [0.0, -s, 0.0],
            ],
        }
    }

    pub fn center(&self) -> f32 {
        self.weights[1][1]
    }
}

/// Sharpen `input`, returning a new buffer of the same size.
///
/// `strength <= 0` (or NaN) returns an unchanged copy.
pub fn sharpen(input: &RgbaImage, strength: f32) -> RgbaImage {
    let mut output = input.clone();
    let (width, height) = input.dimensions();
    if strength.is_nan() || strength <= 0.0 || width < 3 || height < 3 {
        return output;
    }

    let kernel = UnsharpKernel::new(strength);
    let src = input.as_raw();
    let dst: &mut [u8] = &mut output;
    let stride = width as usize * 4;

    for y in 1..height as usize - 1 {
        for x in 1..width as usize - 1 {
            let base = y * stride + x * 4;
            for c in 0..3 {
                let mut sum = 0.0f32;
                for (ky, row) in kernel.weights.iter().enumerate() {
                    for (kx, weight) in row.iter().enumerate() {
                        if *weight == 0.0 {
                            continue;
                        }
                        let idx = (y + ky - 1) * stride + (x + kx - 1) * 4 + c;
                        sum += src[idx] as f32 * weight;
                    }
                }
                dst[base + c] = sum.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    output
}
