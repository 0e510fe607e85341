//! Pure calculation functions for surface dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Smallest width or height accepted for a user-supplied custom dimension.
pub const MIN_CUSTOM_DIMENSION: u32 = 10;

fn round_dim(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Scale both axes by the same factor.
///
/// # Examples
/// ```
/// # use image_enhancer::imaging::scaled_dims;
/// assert_eq!(scaled_dims(800, 600, 0.5), (400, 300));
/// assert_eq!(scaled_dims(801, 601, 1.5), (1202, 902));
/// ```
pub fn scaled_dims(src_w: u32, src_h: u32, scale: f64) -> (u32, u32) {
    (
        round_dim(src_w as f64 * scale),
        round_dim(src_h as f64 * scale),
    )
}

/// Fit the source inside a `max_dim` square, preserving aspect ratio.
///
/// Never upscales: a source already inside the bounds is returned unchanged.
///
/// # Examples
/// ```
/// # use image_enhancer::imaging::capped_dims;
/// assert_eq!(capped_dims(4000, 3000, 2000), (2000, 1500));
/// assert_eq!(capped_dims(640, 480, 2000), (640, 480));
/// ```
pub fn capped_dims(src_w: u32, src_h: u32, max_dim: u32) -> (u32, u32) {
    let ratio = (max_dim as f64 / src_w as f64)
        .min(max_dim as f64 / src_h as f64)
        .min(1.0);
    (
        round_dim(src_w as f64 * ratio),
        round_dim(src_h as f64 * ratio),
    )
}

/// Resolve user-requested custom dimensions against the source.
///
/// - both present → used as-is
/// - one present → the other follows the source aspect ratio
/// - neither present → `None`, the caller falls back to [`scaled_dims`]
pub fn custom_dims(
    src_w: u32,
    src_h: u32,
    custom_w: Option<u32>,
    custom_h: Option<u32>,
) -> Option<(u32, u32)> {
    match (custom_w, custom_h) {
        (Some(w), Some(h)) => Some((w, h)),
        (Some(w), None) => Some((w, round_dim(w as f64 / src_w as f64 * src_h as f64))),
        (None, Some(h)) => Some((round_dim(h as f64 / src_h as f64 * src_w as f64), h)),
        (None, None) => None,
    }
}

/// Target surface dimensions for a render pass.
///
/// Custom dimensions win over the scale factor. Each axis is at least 1px
/// so the surface can always be allocated.
pub fn target_dims(
    source: (u32, u32),
    scale: f64,
    custom_w: Option<u32>,
    custom_h: Option<u32>,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (w, h) = custom_dims(src_w, src_h, custom_w, custom_h)
        .unwrap_or_else(|| scaled_dims(src_w, src_h, scale));
    (w.max(1), h.max(1))
}
