//! # Image Enhancer
//!
//! An interactive raster-image enhancement pipeline. Load an image from a
//! URL or a local file, adjust scale, color and sharpness, and export it as
//! JPEG, PNG, WebP or a single-page PDF.
//!
//! # Architecture: Edit → Schedule → Render → Export
//!
//! ```text
//! 1. Edit      Command  →  FilterState      (validated reducer, no pixels)
//! 2. Schedule  change   →  frame / idle     (debounce, coalesce, cancel)
//! 3. Render    source   →  RenderSurface    (draw + color matrix + tone, then sharpen on idle)
//! 4. Export    surface  →  EncodedOutput    (raster encoders or a PDF page)
//! ```
//!
//! The reducer never touches pixels, and the scheduler never touches state or
//! pixels. [`session::Session`] ties them together and owns every mutable
//! resource. Time is always passed in, so the whole pipeline is deterministic
//! under test.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`state`] | `FilterState`, edit commands, the `apply` reducer, output formats |
//! | [`presets`] | Named color presets and their parameter bundles |
//! | [`scheduler`] | Debounced, frame-aligned render scheduling with an idle tier |
//! | [`session`] | The editing session: loading, edits, rendering, export |
//! | [`source`] | URL validation and fetching with one fallback, uploads, blob handles |
//! | [`export`] | Raster encoding and single-page PDF assembly |
//! | [`imaging`] | Dimension math, color matrix, sharpening, tone, the backend trait |
//! | [`config`] | `image-enhancer.toml` loading, merging, validation |
//! | [`output`] | CLI output formatting |
//! | [`repl`] | Line-oriented interactive front end |
//!
//! # Design Decisions
//!
//! ## One Pass per Render
//!
//! Brightness, contrast and saturation are each an affine color matrix. All
//! three run inside one per-pixel loop, so the base render reads and writes
//! every pixel once no matter how many adjustments are active. Each stage
//! clamps to [0, 255] before the next.
//!
//! ## Sharpening Is Best-Effort
//!
//! The 3×3 sharpening pass is the most expensive step, so it runs after the
//! base render, only when the host reports idle time or a short wait runs
//! out. A newer render simply drops it.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` crate; PDF assembly uses
//! `lopdf`. No system libraries are required.

pub mod config;
pub mod export;
pub mod imaging;
pub mod output;
pub mod presets;
pub mod repl;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;
