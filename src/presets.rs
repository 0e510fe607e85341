//! Named color presets.
//!
//! A preset overwrites the color fields of a [`FilterState`] in one step.
//! Scale, sharpness, export settings and custom dimensions are left alone,
//! except for [`Preset::None`], which is a full reset.
//!
//! | preset | brightness | contrast | saturation | tone |
//! |---|---|---|---|---|
//! | none | 1 | 1 | 1 | full reset |
//! | vintage | 1.1 | 1.2 | 0.8 | |
//! | blackwhite | unchanged | 1.2 | 0 | |
//! | sepia | 1.1 | 1.1 | 0.6 | sepia |
//! | vibrant | 1.1 | 1.3 | 1.4 | |

use crate::imaging::Tone;
use crate::state::{FilterState, ValidationError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    None,
    Vintage,
    BlackWhite,
    Sepia,
    Vibrant,
}

/// The color fields a preset writes. `None` entries are left unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColorBundle {
    brightness: Option<f32>,
    contrast: f32,
    saturation: f32,
    tone: Tone,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::None,
        Preset::Vintage,
        Preset::BlackWhite,
        Preset::Sepia,
        Preset::Vibrant,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::None => "none",
            Preset::Vintage => "vintage",
            Preset::BlackWhite => "blackwhite",
            Preset::Sepia => "sepia",
            Preset::Vibrant => "vibrant",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Preset::None => "reset every adjustment to its default",
            Preset::Vintage => "warm, slightly faded contrast",
            Preset::BlackWhite => "grayscale with a contrast boost",
            Preset::Sepia => "brown-toned monochrome",
            Preset::Vibrant => "punchy contrast and saturation",
        }
    }

    fn bundle(self) -> Option<ColorBundle> {
        let bundle = match self {
            Preset::None => return None,
            Preset::Vintage => ColorBundle {
                brightness: Some(1.1),
                contrast: 1.2,
                saturation: 0.8,
                tone: Tone::None,
            },
            Preset::BlackWhite => ColorBundle {
                brightness: None,
                contrast: 1.2,
                saturation: 0.0,
                tone: Tone::None,
            },
            Preset::Sepia => ColorBundle {
                brightness: Some(1.1),
                contrast: 1.1,
                saturation: 0.6,
                tone: Tone::Sepia,
            },
            Preset::Vibrant => ColorBundle {
                brightness: Some(1.1),
                contrast: 1.3,
                saturation: 1.4,
                tone: Tone::None,
            },
        };
        Some(bundle)
    }
}

impl FromStr for Preset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Preset::None),
            "vintage" => Ok(Preset::Vintage),
            "blackwhite" | "black-white" | "bw" => Ok(Preset::BlackWhite),
            "sepia" => Ok(Preset::Sepia),
            "vibrant" => Ok(Preset::Vibrant),
            other => Err(ValidationError::UnknownPreset(other.to_string())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Return `state` with the preset's color bundle written over it.
pub fn apply_preset(state: &FilterState, preset: Preset) -> FilterState {
    let Some(bundle) = preset.bundle() else {
        return state.reset();
    };
    FilterState {
        brightness: bundle.brightness.unwrap_or(state.brightness),
        contrast: bundle.contrast,
        saturation: bundle.saturation,
        tone: bundle.tone,
        ..state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::OutputFormat;

    fn edited() -> FilterState {
        FilterState {
            scale: 0.5,
            brightness: 0.7,
            contrast: 1.9,
            saturation: 0.2,
            sharpness: 0.6,
            quality: 0.4,
            format: OutputFormat::Webp,
            custom_width: Some(640),
            custom_height: None,
            tone: Tone::Sepia,
        }
    }

    #[test]
    fn none_resets_adjustments_only() {
        let s = apply_preset(&edited(), Preset::None);
        assert_eq!(s.brightness, 1.0);
        assert_eq!(s.contrast, 1.0);
        assert_eq!(s.saturation, 1.0);
        assert_eq!(s.sharpness, 0.0);
        assert_eq!(s.scale, 1.0);
        assert_eq!(s.tone, Tone::None);
        assert_eq!(s.format, OutputFormat::Webp);
        assert_eq!(s.quality, 0.4);
        assert_eq!(s.custom_width, Some(640));
    }

    #[test]
    fn vintage_table_values() {
        let s = apply_preset(&edited(), Preset::Vintage);
        assert_eq!((s.brightness, s.contrast, s.saturation), (1.1, 1.2, 0.8));
        assert_eq!(s.tone, Tone::None);
    }

    #[test]
    fn blackwhite_keeps_brightness() {
        let s = apply_preset(&edited(), Preset::BlackWhite);
        assert_eq!(s.brightness, 0.7);
        assert_eq!(s.contrast, 1.2);
        assert_eq!(s.saturation, 0.0);
    }

    #[test]
    fn sepia_sets_tone() {
        let s = apply_preset(&FilterState::default(), Preset::Sepia);
        assert_eq!((s.brightness, s.contrast, s.saturation), (1.1, 1.1, 0.6));
        assert_eq!(s.tone, Tone::Sepia);
    }

    #[test]
    fn vibrant_table_values() {
        let s = apply_preset(&edited(), Preset::Vibrant);
        assert_eq!((s.brightness, s.contrast, s.saturation), (1.1, 1.3, 1.4));
    }

    #[test]
    fn presets_leave_scale_sharpness_and_dimensions() {
        for preset in [Preset::Vintage, Preset::BlackWhite, Preset::Sepia, Preset::Vibrant] {
            let s = apply_preset(&edited(), preset);
            assert_eq!(s.scale, 0.5, "{preset}");
            assert_eq!(s.sharpness, 0.6, "{preset}");
            assert_eq!(s.custom_width, Some(640), "{preset}");
            assert_eq!(s.format, OutputFormat::Webp, "{preset}");
        }
    }

    #[test]
    fn deterministic() {
        let a = apply_preset(&edited(), Preset::Vintage);
        let b = apply_preset(&apply_preset(&edited(), Preset::Vintage), Preset::Vintage);
        assert_eq!(a, b);
    }

    #[test]
    fn parse_names_and_aliases() {
        assert_eq!("Sepia".parse::<Preset>().unwrap(), Preset::Sepia);
        assert_eq!("bw".parse::<Preset>().unwrap(), Preset::BlackWhite);
        assert_eq!("black-white".parse::<Preset>().unwrap(), Preset::BlackWhite);
        assert_eq!(
            "noir".parse::<Preset>().unwrap_err(),
            ValidationError::UnknownPreset("noir".to_string())
        );
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
        }
    }
}
