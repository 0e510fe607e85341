//! Whole-image tone transforms applied after the compositor pass.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Tone mapping selected by a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    None,
    Sepia,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Tone::None => "none",
            Tone::Sepia => "sepia",
        })
    }
}

const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Map one pixel through the sepia matrix. Alpha passes through.
#[inline]
pub fn sepia_pixel(px: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = px;
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let channel =
        |w: &[f32; 3]| (w[0] * r + w[1] * g + w[2] * b).round().clamp(0.0, 255.0) as u8;
    [channel(&SEPIA[0]), channel(&SEPIA[1]), channel(&SEPIA[2]), a]
}

pub fn apply_tone(image: &mut RgbaImage, tone: Tone) {
    match tone {
        Tone::None => {}
        Tone::Sepia => {
            for px in image.pixels_mut() {
                px.0 = sepia_pixel(px.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sepia_black_stays_black() {
        assert_eq!(sepia_pixel([0, 0, 0, 255]), [0, 0, 0, 255]);
    }

    #[test]
    fn sepia_white_saturates_red_and_green() {
        // 255 * 1.351 and 255 * 1.203 both exceed 255; blue is 255 * 0.937
        assert_eq!(sepia_pixel([255, 255, 255, 255]), [255, 255, 239, 255]);
    }

    #[test]
    fn sepia_midtone() {
        // R = 0.393*100 + 0.769*50 + 0.189*20 = 81.53
        // G = 0.349*100 + 0.686*50 + 0.168*20 = 72.56
        // B = 0.272*100 + 0.534*50 + 0.131*20 = 56.52
        assert_eq!(sepia_pixel([100, 50, 20, 9]), [82, 73, 57, 9]);
    }

    #[test]
    fn tone_none_is_noop() {
        let mut img = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]));
        apply_tone(&mut img, Tone::None);
        assert!(img.pixels().all(|p| p.0 == [1, 2, 3, 4]));
    }

    proptest! {
        #[test]
        fn sepia_preserves_alpha(r: u8, g: u8, b: u8, a: u8) {
            // Channel range is guaranteed by the u8 type; alpha must not move
            let out = sepia_pixel([r, g, b, a]);
            prop_assert_eq!(out[3], a);
            prop_assert!(out[2] <= out[1] && out[1] <= out[0]);
        }
    }
}
