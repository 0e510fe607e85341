//! Image sources: URL fetching with one proxy fallback, upload
//! normalization, and the scoped blobs that back uploaded images.
//!
//! ## URL loading
//!
//! ```text
//! validate_url ──▶ fetch(url) ──▶ decode ──▶ SourceImage
//!                     │ fail        │ fail
//!                     ▼             ▼
//!              fetch(prefix + url) ──▶ decode ──▶ SourceImage
//!                     │ fail
//!                     ▼
//!                 LoadError (primary failure, user-actionable message)
//! ```
//!
//! Exactly one fallback attempt is made. Validation happens before any
//! network traffic, so a rejected URL never reaches the fetcher.

use crate::imaging::{RasterFormat, supported_input_extensions};
use crate::state::ValidationError;
use image::{ImageFormat, RgbaImage};
use regex::Regex;
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FALLBACK_PREFIX: &str = "https://cors-anywhere.herokuapp.com/";

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|bmp|webp)(\?.*)?$").expect("image URL pattern must compile")
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("Access to {url} was refused (HTTP {status})")]
    Blocked { url: String, status: u16 },
    #[error("Could not decode image: {0}")]
    Format(String),
}

impl LoadError {
    /// Message suitable for showing to the person who typed the URL.
    pub fn user_message(&self) -> String {
        let cause = match self {
            LoadError::Blocked { .. } => "Access to this image is forbidden by the server. ",
            LoadError::Format(_) => "The file is not an image this tool can read. ",
            LoadError::Network { .. } => "",
        };
        format!("Failed to load image. {cause}Please try a different image or website.")
    }
}

/// Parse and check an image URL: absolute http(s) ending in a known
/// image extension, optionally followed by a query string.
pub fn validate_url(input: &str) -> Result<Url, ValidationError> {
    let input = input.trim();
    let invalid = || ValidationError::InvalidUrl(input.to_string());
    let url = Url::parse(input).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || !IMAGE_URL.is_match(input) {
        return Err(invalid());
    }
    Ok(url)
}

/// Anything that can turn a URL into bytes.
pub trait Fetch {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, LoadError>;
}

/// Production fetcher on a blocking `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("image-enhancer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadError::Network {
                url: String::new(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, LoadError> {
        let network = |reason: String| LoadError::Network {
            url: url.to_string(),
            reason,
        };
        let response = self.client.get(url.clone()).send().map_err(|e| {
            if e.is_timeout() {
                network("timed out".to_string())
            } else {
                network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LoadError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(network(format!("HTTP {status}")));
        }
        let bytes = response.bytes().map_err(|e| network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Fetch-and-decode with a single retry through a proxy prefix.
pub struct SourceResolver<F> {
    fetcher: F,
    fallback_prefix: String,
}

impl<F: Fetch> SourceResolver<F> {
    pub fn new(fetcher: F, fallback_prefix: impl Into<String>) -> Self {
        Self {
            fetcher,
            fallback_prefix: fallback_prefix.into(),
        }
    }

    fn attempt<T>(
        &self,
        url: &Url,
        decode: &impl Fn(&[u8]) -> Result<T, LoadError>,
    ) -> Result<T, LoadError> {
        let bytes = self.fetcher.fetch(url)?;
        decode(&bytes)
    }

    /// Load `url`, retrying once through the fallback prefix if either the
    /// fetch or the decode fails. The primary failure is what gets reported.
    pub fn resolve<T>(
        &self,
        url: &Url,
        decode: impl Fn(&[u8]) -> Result<T, LoadError>,
    ) -> Result<T, LoadError> {
        let primary = match self.attempt(url, &decode) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        log::warn!("Loading {url} failed ({primary}), retrying through fallback proxy");

        let proxied = match Url::parse(&format!("{}{}", self.fallback_prefix, url)) {
            Ok(proxied) => proxied,
            Err(e) => {
                log::warn!("Fallback prefix '{}' is not usable: {e}", self.fallback_prefix);
                return Err(primary);
            }
        };
        match self.attempt(&proxied, &decode) {
            Ok(value) => {
                log::info!("Loaded {url} through fallback proxy");
                Ok(value)
            }
            Err(fallback) => {
                log::warn!("Fallback for {url} failed too: {fallback}");
                Err(primary)
            }
        }
    }
}

// ============================================================================
// Uploads
// ============================================================================

/// Mime type implied by a file's extension, for formats that can be decoded.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !supported_input_extensions().contains(&ext.as_str()) {
        return None;
    }
    ImageFormat::from_extension(&ext).map(|f| f.to_mime_type())
}

/// The recompression format for an upload with the given mime type.
///
/// Anything outside `image/*` is rejected. PNG and WebP keep their format;
/// every other image subtype is recompressed as JPEG.
pub fn upload_format(mime: &str) -> Result<RasterFormat, ValidationError> {
    let mime = mime.trim().to_ascii_lowercase();
    let Some(subtype) = mime.strip_prefix("image/") else {
        return Err(ValidationError::UnsupportedFileType(mime));
    };
    Ok(match subtype {
        "png" => RasterFormat::Png,
        "webp" => RasterFormat::WebP,
        _ => RasterFormat::Jpeg,
    })
}

// ============================================================================
// Blobs
// ============================================================================

/// Owned token for one registered blob. Not `Clone`: releasing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct BlobHandle(u64);

impl BlobHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Registry of backing blobs for uploaded images.
#[derive(Debug, Default)]
pub struct BlobStore {
    next_id: u64,
    blobs: HashMap<u64, Vec<u8>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, bytes: Vec<u8>) -> BlobHandle {
        self.next_id += 1;
        self.blobs.insert(self.next_id, bytes);
        log::debug!("registered blob {} ({} live)", self.next_id, self.blobs.len());
        BlobHandle(self.next_id)
    }

    pub fn get(&self, handle: &BlobHandle) -> Option<&[u8]> {
        self.blobs.get(&handle.0).map(Vec::as_slice)
    }

    pub fn release(&mut self, handle: BlobHandle) {
        if self.blobs.remove(&handle.0).is_some() {
            log::debug!("released blob {} ({} live)", handle.0, self.blobs.len());
        }
    }

    pub fn live_count(&self) -> usize {
        self.blobs.len()
    }
}

// ============================================================================
// Source image
// ============================================================================

/// Where a source image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    Url(String),
    Upload { name: String },
    Bytes,
}

/// A decoded source image. Immutable once loaded.
#[derive(Debug)]
pub struct SourceImage {
    pub pixels: RgbaImage,
    pub backing: Option<BlobHandle>,
    pub origin: SourceOrigin,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage, origin: SourceOrigin) -> Self {
        Self {
            pixels,
            backing: None,
            origin,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}
