//! Filter state and the command reducer.
//!
//! [`FilterState`] is the full set of user-adjustable parameters. It only
//! changes through [`apply`], which validates a [`Command`] and returns the
//! next state, leaving the input untouched on error. Deciding *when* to
//! re-render after a change is the scheduler's job; [`Command::render_policy`]
//! only says how urgent the change is.

use crate::imaging::{MIN_CUSTOM_DIMENSION, RasterFormat, Tone};
use crate::presets::{Preset, apply_preset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Input rejected before any state changed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{key} must be {expected} (got {value})")]
    OutOfRange {
        key: FilterKey,
        value: f32,
        expected: &'static str,
    },
    #[error("Dimensions must be at least {min}px (got {value})")]
    DimensionTooSmall { value: u32, min: u32 },
    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("Unknown output format '{0}'")]
    UnknownFormat(String),
    #[error("Please enter a valid image URL (must be .jpg, .jpeg, .png, .gif, .bmp or .webp): {0}")]
    InvalidUrl(String),
    #[error("Please select a valid image file (JPEG, PNG, GIF, etc.): {0}")]
    UnsupportedFileType(String),
    #[error("A {width} × {height}px image exceeds the {max}-pixel limit")]
    SurfaceTooLarge { width: u32, height: u32, max: u64 },
}

/// Output encodings offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
    Pdf,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Pdf,
    ];

    /// Canonical file extension. `jpg` input normalizes to `jpeg`.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Pdf => "application/pdf",
        }
    }

    /// The raster encoding, or `None` for the document format.
    pub fn raster(self) -> Option<RasterFormat> {
        match self {
            OutputFormat::Jpeg => Some(RasterFormat::Jpeg),
            OutputFormat::Png => Some(RasterFormat::Png),
            OutputFormat::Webp => Some(RasterFormat::WebP),
            OutputFormat::Pdf => None,
        }
    }

    /// Whether the quality setting has any effect.
    pub fn uses_quality(self) -> bool {
        self.raster().is_some_and(RasterFormat::is_lossy)
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(ValidationError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A numeric field of [`FilterState`] that `set` commands address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Scale,
    Brightness,
    Contrast,
    Saturation,
    Sharpness,
    Quality,
}

impl FilterKey {
    pub fn name(self) -> &'static str {
        match self {
            FilterKey::Scale => "scale",
            FilterKey::Brightness => "brightness",
            FilterKey::Contrast => "contrast",
            FilterKey::Saturation => "saturation",
            FilterKey::Sharpness => "sharpness",
            FilterKey::Quality => "quality",
        }
    }

    /// Check `value` against the range this key accepts.
    pub fn validate(self, value: f32) -> Result<f32, ValidationError> {
        let (ok, expected) = match self {
            FilterKey::Scale => (value > 0.0, "greater than 0"),
            FilterKey::Brightness | FilterKey::Contrast | FilterKey::Saturation => {
                (value >= 0.0, "at least 0")
            }
            FilterKey::Sharpness => ((0.0..=1.0).contains(&value), "between 0 and 1"),
            FilterKey::Quality => (value > 0.0 && value <= 1.0, "in (0, 1]"),
        };
        if value.is_finite() && ok {
            Ok(value)
        } else {
            Err(ValidationError::OutOfRange {
                key: self,
                value,
                expected,
            })
        }
    }
}

impl FromStr for FilterKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scale" => Ok(FilterKey::Scale),
            "brightness" => Ok(FilterKey::Brightness),
            "contrast" => Ok(FilterKey::Contrast),
            "saturation" | "saturate" => Ok(FilterKey::Saturation),
            "sharpness" | "sharpen" => Ok(FilterKey::Sharpness),
            "quality" => Ok(FilterKey::Quality),
            other => Err(ValidationError::UnknownFilter(other.to_string())),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every user-adjustable parameter for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub scale: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sharpness: f32,
    pub quality: f32,
    pub format: OutputFormat,
    pub custom_width: Option<u32>,
    pub custom_height: Option<u32>,
    /// Set only by presets; cleared by reset and by every other preset.
    pub tone: Tone,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 0.0,
            quality: 0.85,
            format: OutputFormat::default(),
            custom_width: None,
            custom_height: None,
            tone: Tone::None,
        }
    }
}

impl FilterState {
    /// Start from defaults with the given export settings.
    pub fn with_export(format: OutputFormat, quality: f32) -> Self {
        Self {
            format,
            quality,
            ..Self::default()
        }
    }

    /// Restore the adjustment defaults; export settings and custom
    /// dimensions are kept.
    pub fn reset(&self) -> Self {
        Self {
            quality: self.quality,
            format: self.format,
            custom_width: self.custom_width,
            custom_height: self.custom_height,
            ..Self::default()
        }
    }

    /// Drop settings tied to the previous image's shape.
    pub fn for_new_source(&self) -> Self {
        Self {
            custom_width: None,
            custom_height: None,
            ..self.clone()
        }
    }

    pub fn get(&self, key: FilterKey) -> f32 {
        match key {
            FilterKey::Scale => self.scale,
            FilterKey::Brightness => self.brightness,
            FilterKey::Contrast => self.contrast,
            FilterKey::Saturation => self.saturation,
            FilterKey::Sharpness => self.sharpness,
            FilterKey::Quality => self.quality,
        }
    }

    fn set(&mut self, key: FilterKey, value: f32) {
        let slot = match key {
            FilterKey::Scale => &mut self.scale,
            FilterKey::Brightness => &mut self.brightness,
            FilterKey::Contrast => &mut self.contrast,
            FilterKey::Saturation => &mut self.saturation,
            FilterKey::Sharpness => &mut self.sharpness,
            FilterKey::Quality => &mut self.quality,
        };
        *slot = value;
    }
}

/// How soon a state change needs a new render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPolicy {
    /// Continuous edits: wait for the debounce window to go quiet.
    Debounced,
    /// Discrete edits: render at the next frame.
    Immediate,
    /// Pixels are unaffected.
    Skip,
}

/// One user edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(FilterKey, f32),
    SetFormat(OutputFormat),
    Preset(Preset),
    CustomDimensions {
        width: Option<u32>,
        height: Option<u32>,
    },
    Reset,
}

impl Command {
    pub fn render_policy(&self) -> RenderPolicy {
        match self {
            Command::Set(FilterKey::Quality, _) | Command::SetFormat(_) => RenderPolicy::Skip,
            Command::Set(..) => RenderPolicy::Debounced,
            Command::Preset(_) | Command::CustomDimensions { .. } | Command::Reset => {
                RenderPolicy::Immediate
            }
        }
    }
}

fn check_dimension(value: Option<u32>) -> Result<Option<u32>, ValidationError> {
    match value {
        Some(v) if v < MIN_CUSTOM_DIMENSION => Err(ValidationError::DimensionTooSmall {
            value: v,
            min: MIN_CUSTOM_DIMENSION,
        }),
        other => Ok(other),
    }
}

/// Apply `command` to `state`, returning the next state.
pub fn apply(state: &FilterState, command: &Command) -> Result<FilterState, ValidationError> {
    let mut next = state.clone();
    match command {
        Command::Set(key, value) => {
            let value = key.validate(*value)?;
            next.set(*key, value);
        }
        Command::SetFormat(format) => next.format = *format,
        Command::Preset(preset) => next = apply_preset(state, *preset),
        Command::CustomDimensions { width, height } => {
            next.custom_width = check_dimension(*width)?;
            next.custom_height = check_dimension(*height)?;
        }
        Command::Reset => next = state.reset(),
    }
    Ok(next)
}
