//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Scale + color adjustment** | `imageops::resize` + one [`ColorMatrix`] pass |
//! | **Tone** | per-pixel sepia matrix |
//! | **Sharpen** | 3×3 unsharp kernel, RGB only |
//! | **Encode** | `image` JPEG / PNG / WebP (lossless) encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Compositor / tone / sharpen**: Pure pixel transforms
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
mod compositor;
pub mod operations;
mod params;
pub mod rust_backend;
mod sharpen;
mod tone;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{MIN_CUSTOM_DIMENSION, capped_dims, custom_dims, scaled_dims, target_dims};
pub use compositor::ColorMatrix;
pub use operations::{PreparedUpload, RenderPlan, UploadConfig, prepare_upload, render_base};
pub use params::{DrawParams, EncodeParams, Quality, RasterFormat};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use sharpen::{UnsharpKernel, sharpen};
pub use tone::{Tone, apply_tone, sepia_pixel};
