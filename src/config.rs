//! Enhancer configuration module.
//!
//! Handles loading, validating, and merging the `image-enhancer.toml` file.
//! Stock defaults are the base layer; a user file overrides any subset of
//! keys on top of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [render]
//! debounce_ms = 100         # Quiet period before a slider change renders
//! idle_timeout_ms = 100     # Longest wait for idle time before sharpening
//! resample = "lanczos3"     # nearest | triangle | catmull-rom | gaussian | lanczos3
//! max_surface_pixels = 50000000  # Edits planning a larger surface are rejected
//!
//! [upload]
//! max_dimension = 2000      # Uploads are downsampled to fit this square
//! quality = 0.85            # Recompression quality (0, 1]
//!
//! [export]
//! format = "jpeg"           # jpeg | png | webp | pdf
//! quality = 0.85            # JPEG quality (0, 1]
//! document_image_quality = 0.9  # JPEG quality of the image inside a PDF
//!
//! [source]
//! fallback_prefix = "https://cors-anywhere.herokuapp.com/"
//! timeout_secs = 30
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{MIN_CUSTOM_DIMENSION, Quality, UploadConfig};
use crate::source::DEFAULT_FALLBACK_PREFIX;
use crate::state::OutputFormat;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "image-enhancer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Enhancer configuration loaded from `image-enhancer.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnhancerConfig {
    /// Render scheduling and resampling.
    pub render: RenderConfig,
    /// Upload normalization.
    pub upload: UploadSettings,
    /// Default export format and quality.
    pub export: ExportConfig,
    /// Remote image fetching.
    pub source: SourceConfig,
}

impl EnhancerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(ConfigError::Validation(format!(
                    "{name} must be in (0, 1], got {value}"
                )))
            }
        };
        fraction("upload.quality", self.upload.quality)?;
        fraction("export.quality", self.export.quality)?;
        fraction(
            "export.document_image_quality",
            self.export.document_image_quality,
        )?;

        if self.upload.max_dimension < MIN_CUSTOM_DIMENSION {
            return Err(ConfigError::Validation(format!(
                "upload.max_dimension must be at least {MIN_CUSTOM_DIMENSION}"
            )));
        }
        if self.render.max_surface_pixels == 0 {
            return Err(ConfigError::Validation(
                "render.max_surface_pixels must be non-zero".into(),
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "source.timeout_secs must be non-zero".into(),
            ));
        }
        let prefix = &self.source.fallback_prefix;
        if !(prefix.starts_with("http://") || prefix.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "source.fallback_prefix must be an http(s) URL prefix, got '{prefix}'"
            )));
        }
        Ok(())
    }
}

/// Resampling filter used when the surface size differs from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    pub fn to_filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Render scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Quiet period after a continuous edit before rendering.
    pub debounce_ms: u64,
    /// Upper bound on waiting for idle time before the sharpening pass.
    pub idle_timeout_ms: u64,
    pub resample: ResampleFilter,
    /// Largest surface (width × height) an edit may plan.
    pub max_surface_pixels: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            idle_timeout_ms: 100,
            resample: ResampleFilter::default(),
            max_surface_pixels: 50_000_000,
        }
    }
}

impl RenderConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Upload normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadSettings {
    /// Uploads larger than this on either axis are downsampled.
    pub max_dimension: u32,
    /// Recompression quality as a fraction.
    pub quality: f32,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            quality: 0.85,
        }
    }
}

impl UploadSettings {
    pub fn to_upload_config(&self) -> UploadConfig {
        UploadConfig {
            max_dimension: self.max_dimension,
            quality: Quality::new(self.quality),
        }
    }
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub format: OutputFormat,
    /// JPEG quality as a fraction.
    pub quality: f32,
    /// JPEG quality of the image embedded in a PDF export.
    pub document_image_quality: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 0.85,
            document_image_quality: 0.9,
        }
    }
}

/// Remote image fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Prepended to the URL for the single retry after a failed load.
    pub fallback_prefix: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fallback_prefix: DEFAULT_FALLBACK_PREFIX.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EnhancerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EnhancerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EnhancerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file
/// is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<EnhancerConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        log::debug!("Loaded config overrides from {}", path.display());
    }
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Enhancer Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from ./image-enhancer.toml, or from the path given
# with --config. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Quiet period (ms) after a slider-style change before the preview renders.
# Bursts of changes inside this window collapse into one render.
debounce_ms = 100

# Longest wait (ms) for idle time before the sharpening pass runs anyway.
idle_timeout_ms = 100

# Resampling filter for scaling: nearest, triangle, catmull-rom, gaussian,
# lanczos3.
resample = "lanczos3"

# Largest preview/export surface in pixels (width × height). Scale or size
# edits that would exceed it are rejected.
max_surface_pixels = 50000000

# ---------------------------------------------------------------------------
# Uploads
# ---------------------------------------------------------------------------
[upload]
# Local files larger than this on either axis are downsampled to fit.
max_dimension = 2000

# Recompression quality for uploads, as a fraction in (0, 1].
quality = 0.85

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Default output format: jpeg, png, webp or pdf.
format = "jpeg"

# JPEG quality as a fraction in (0, 1]. PNG and WebP are lossless.
quality = 0.85

# JPEG quality of the page image inside a PDF export.
document_image_quality = 0.9

# ---------------------------------------------------------------------------
# Remote sources
# ---------------------------------------------------------------------------
[source]
# When a URL fails to load, one retry is made with this prefix prepended.
fallback_prefix = "https://cors-anywhere.herokuapp.com/"

# Request timeout in seconds.
timeout_secs = 30
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = EnhancerConfig::default();
        assert_eq!(config.render.debounce_ms, 100);
        assert_eq!(config.render.idle_timeout_ms, 100);
        assert_eq!(config.upload.max_dimension, 2000);
        assert_eq!(config.upload.quality, 0.85);
        assert_eq!(config.export.format, OutputFormat::Jpeg);
        assert_eq!(config.export.document_image_quality, 0.9);
        assert_eq!(config.source.fallback_prefix, DEFAULT_FALLBACK_PREFIX);
    }

    #[test]
    fn parse_partial_config() {
        let config: EnhancerConfig = toml::from_str(
            r#"
[export]
format = "png"
"#,
        )
        .unwrap();
        assert_eq!(config.export.format, OutputFormat::Png);
        assert_eq!(config.export.quality, 0.85);
        assert_eq!(config.render.debounce_ms, 100);
    }

    #[test]
    fn parse_format_alias_and_resample() {
        let config: EnhancerConfig = toml::from_str(
            r#"
[export]
format = "jpg"

[render]
resample = "catmull-rom"
"#,
        )
        .unwrap();
        assert_eq!(config.export.format, OutputFormat::Jpeg);
        assert_eq!(
            config.render.resample.to_filter_type(),
            FilterType::CatmullRom
        );
    }

    #[test]
    fn durations() {
        let config = EnhancerConfig::default();
        assert_eq!(config.render.debounce(), Duration::from_millis(100));
        assert_eq!(config.source.timeout(), Duration::from_secs(30));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.upload.max_dimension, 2000);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[upload]
max_dimension = 1024

[render]
debounce_ms = 250
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.upload.max_dimension, 1024);
        assert_eq!(config.render.debounce_ms, 250);
        // Unspecified values should be defaults
        assert_eq!(config.upload.quality, 0.85);
        assert_eq!(config.render.idle_timeout_ms, 100);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[export]
quality = 1.5
"#,
        )
        .unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 0.85"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 0.5"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_float(), Some(0.5));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[upload]
max_dimension = 2000
quality = 0.85
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[upload]
max_dimension = 800
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let upload = merged.get("upload").unwrap();
        assert_eq!(upload.get("max_dimension").unwrap().as_integer(), Some(800));
        // quality preserved from base
        assert_eq!(upload.get("quality").unwrap().as_float(), Some(0.85));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<EnhancerConfig, _> = toml::from_str(
            r#"
[export]
qualty = 0.9
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<EnhancerConfig, _> = toml::from_str(
            r#"
[exports]
quality = 0.9
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let result: Result<EnhancerConfig, _> = toml::from_str(
            r#"
[export]
format = "tiff"
"#,
        );
        assert!(result.is_err());
    }

    // =========================================================================
    // validate tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EnhancerConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_boundary_ok() {
        let mut config = EnhancerConfig::default();
        config.export.quality = 1.0;
        config.upload.quality = 0.01;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_zero_quality_rejected() {
        let mut config = EnhancerConfig::default();
        config.upload.quality = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_tiny_max_dimension_rejected() {
        let mut config = EnhancerConfig::default();
        config.upload.max_dimension = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_surface_cap_rejected() {
        let mut config = EnhancerConfig::default();
        config.render.max_surface_pixels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_prefix_must_be_http() {
        let mut config = EnhancerConfig::default();
        config.source.fallback_prefix = "proxy/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_config_with_overlay() {
        let overlay: toml::Value = toml::from_str(
            r#"
[source]
timeout_secs = 5
"#,
        )
        .unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.source.timeout_secs, 5);
        assert_eq!(config.source.fallback_prefix, DEFAULT_FALLBACK_PREFIX);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: EnhancerConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = EnhancerConfig::default();
        assert_eq!(config.render.debounce_ms, defaults.render.debounce_ms);
        assert_eq!(config.render.resample, defaults.render.resample);
        assert_eq!(
            config.render.max_surface_pixels,
            defaults.render.max_surface_pixels
        );
        assert_eq!(config.upload.max_dimension, defaults.upload.max_dimension);
        assert_eq!(config.upload.quality, defaults.upload.quality);
        assert_eq!(config.export.format, defaults.export.format);
        assert_eq!(
            config.export.document_image_quality,
            defaults.export.document_image_quality
        );
        assert_eq!(config.source.fallback_prefix, defaults.source.fallback_prefix);
        assert_eq!(config.source.timeout_secs, defaults.source.timeout_secs);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        for section in ["render", "upload", "export", "source"] {
            assert!(val.get(section).is_some(), "{section}");
        }
    }
}
