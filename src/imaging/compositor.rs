//! Filter compositor: brightness, contrast and saturation as color matrices.
//!
//! Each adjustment is an affine map on the RGB vector, in the form used by
//! CSS/SVG color filters (`feColorMatrix`), expressed in 0–255 units. The
//! three stages run in fixed order (brightness → contrast → saturation) and
//! each stage's output is clamped to [0, 255] before the next one sees it,
//! as a chain of filter primitives would. All stages run inside a single
//! per-pixel pass; stages at identity are skipped.
//!
//! Alpha is never modified.

use image::RgbaImage;

/// Midpoint contrast pivots around.
const CONTRAST_PIVOT: f32 = 128.0;

// Luma weights used by the saturate filter.
const LUMA_R: f32 = 0.213;
const LUMA_G: f32 = 0.715;
const LUMA_B: f32 = 0.072;

/// One affine stage: `out[i] = Σ m[i][j]·in[j] + m[i][3]`.
type Affine = [[f32; 4]; 3];

const IDENTITY_STAGE: Affine = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

fn is_identity_stage(stage: &Affine) -> bool {
    stage
        .iter()
        .flatten()
        .zip(IDENTITY_STAGE.iter().flatten())
        .all(|(a, b)| (a - b).abs() < 1e-6)
}

fn diagonal(scale: f32, offset: f32) -> Affine {
    [
        [scale, 0.0, 0.0, offset],
        [0.0, scale, 0.0, offset],
        [0.0, 0.0, scale, offset],
    ]
}

/// The color adjustment for one draw: brightness, contrast and saturation
/// stages, applied in that order with clamping between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    stages: [Affine; 3],
}

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix {
        stages: [IDENTITY_STAGE; 3],
    };

    /// Multiply every channel by `amount`. 0 is black, 1 is identity.
    pub fn brightness(amount: f32) -> Self {
        Self::from_adjustments(amount, 1.0, 1.0)
    }

    /// Stretch channel values away from (or toward) the midpoint.
    pub fn contrast(amount: f32) -> Self {
        Self::from_adjustments(1.0, amount, 1.0)
    }

    /// Scale chroma distance from gray. 0 is grayscale, 1 is identity.
    pub fn saturation(amount: f32) -> Self {
        Self::from_adjustments(1.0, 1.0, amount)
    }

    /// The full adjustment for one render: brightness, then contrast, then saturation.
    pub fn from_adjustments(brightness: f32, contrast: f32, saturation: f32) -> Self {
        Self {
            stages: [
                diagonal(brightness, 0.0),
                diagonal(contrast, CONTRAST_PIVOT * (1.0 - contrast)),
                saturation_stage(saturation),
            ],
        }
    }

    pub fn is_identity(&self) -> bool {
        self.stages.iter().all(is_identity_stage)
    }

    /// Transform one RGBA pixel; alpha passes through.
    #[inline]
    pub fn apply_pixel(&self, px: [u8; 4]) -> [u8; 4] {
        let [r, g, b, a] = px;
        let mut rgb = [r as f32, g as f32, b as f32];
        for stage in self.stages.iter().filter(|s| !is_identity_stage(s)) {
            let [r, g, b] = rgb;
            rgb = [0usize, 1, 2].map(|i| {
                let row = &stage[i];
                (row[0] * r + row[1] * g + row[2] * b + row[3]).clamp(0.0, 255.0)
            });
        }
        let [r, g, b] = rgb.map(|v| v.round() as u8);
        [r, g, b, a]
    }

    /// Apply to a whole buffer in one pass. Identity adjustments are a no-op.
    pub fn apply_in_place(&self, image: &mut RgbaImage) {
        if self.is_identity() {
            return;
        }
        for px in image.pixels_mut() {
            px.0 = self.apply_pixel(px.0);
        }
    }
}

fn saturation_stage(s: f32) -> Affine {
    [
        [
            LUMA_R + (1.0 - LUMA_R) * s,
            LUMA_G - LUMA_G * s,
            LUMA_B - LUMA_B * s,
            0.0,
        ],
        [
            LUMA_R - LUMA_R * s,
            LUMA_G + (1.0 - LUMA_G) * s,
            LUMA_B - LUMA_B * s,
            0.0,
        ],
        [
            LUMA_R - LUMA_R * s,
            LUMA_G - LUMA_G * s,
            LUMA_B + (1.0 - LUMA_B) * s,
            0.0,
        ],
    ]
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
