//! The editing session: one source image, one filter state, one surface.
//!
//! A [`Session`] owns everything mutable. Edits go through the reducer in
//! [`state`](crate::state), which decides *what* the next state is; the
//! [`RenderScheduler`] decides *when* the surface is redrawn. The host
//! drives time by calling [`Session::pump`] with the current instant and
//! whether it has idle time to spare.
//!
//! ```text
//! set_filter ─▶ apply ─▶ scheduler ─▶ pump ─▶ render_base ─▶ surface
//!                                       │
//!                                       └─(idle)─▶ sharpen ─▶ surface
//! ```
//!
//! [`Session::render`] and [`Session::encode`] settle any pending work
//! first, so callers that don't care about pacing can ignore `pump`.

use crate::config::EnhancerConfig;
use crate::export::{EncodeError, EncodedOutput, encode_surface};
use crate::imaging::{
    BackendError, ColorMatrix, ImageBackend, Quality, RenderPlan, prepare_upload, render_base,
    sharpen, target_dims,
};
use crate::presets::Preset;
use crate::scheduler::{FrameTicket, IdleTicket, JobId, Phase, RenderScheduler, SchedulerStats};
use crate::source::{
    BlobStore, Fetch, LoadError, SourceImage, SourceOrigin, SourceResolver, mime_for_path,
    upload_format, validate_url,
};
use crate::state::{
    Command, FilterKey, FilterState, OutputFormat, RenderPolicy, ValidationError, apply,
};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Render failed: {0}")]
    Render(#[from] BackendError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No image loaded")]
    NoImage,
}

fn plan_dims(source: &SourceImage, state: &FilterState) -> (u32, u32) {
    target_dims(
        source.dimensions(),
        f64::from(state.scale),
        state.custom_width,
        state.custom_height,
    )
}

/// Snapshot consumed by one base render.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementJob {
    pub id: JobId,
    pub state: FilterState,
    pub width: u32,
    pub height: u32,
}

impl EnhancementJob {
    fn plan(&self) -> RenderPlan {
        RenderPlan {
            width: self.width,
            height: self.height,
            adjustment: ColorMatrix::from_adjustments(
                self.state.brightness,
                self.state.contrast,
                self.state.saturation,
            ),
            tone: self.state.tone,
        }
    }
}

/// The rendered preview. Always fully redrawn, never patched.
#[derive(Debug)]
pub struct RenderSurface {
    pub pixels: RgbaImage,
    /// The job that drew it. Its state snapshot is what the pixels show.
    pub job: EnhancementJob,
    /// Whether the idle sharpening pass has replaced the base render.
    pub sharpened: bool,
}

impl RenderSurface {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// What one [`Session::pump`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpOutcome {
    pub rendered: bool,
    pub sharpened: bool,
}

pub struct Session<B: ImageBackend> {
    backend: B,
    config: EnhancerConfig,
    state: FilterState,
    source: Option<SourceImage>,
    surface: Option<RenderSurface>,
    scheduler: RenderScheduler,
    blobs: BlobStore,
}

impl<B: ImageBackend> Session<B> {
    pub fn new(backend: B, config: EnhancerConfig) -> Self {
        let scheduler =
            RenderScheduler::new(config.render.debounce(), config.render.idle_timeout());
        let state = FilterState::with_export(config.export.format, config.export.quality);
        Self {
            backend,
            config,
            state,
            source: None,
            surface: None,
            scheduler,
            blobs: BlobStore::new(),
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// The last rendered surface, which may lag the state until pumped.
    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    pub fn stats(&self) -> &SchedulerStats {
        self.scheduler.stats()
    }

    pub fn live_blobs(&self) -> usize {
        self.blobs.live_count()
    }

    /// No render or sharpening pass is waiting.
    pub fn is_settled(&self) -> bool {
        self.scheduler.is_settled()
    }

    /// When the next timer-driven step is due, for hosts that sleep between pumps.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Surface size the current state would render at.
    pub fn planned_dimensions(&self) -> Option<(u32, u32)> {
        let source = self.source.as_ref()?;
        Some(plan_dims(source, &self.state))
    }

    fn check_surface(&self, (width, height): (u32, u32)) -> Result<(), ValidationError> {
        let max = self.config.render.max_surface_pixels;
        match u64::from(width).checked_mul(u64::from(height)) {
            Some(pixels) if pixels <= max => Ok(()),
            _ => Err(ValidationError::SurfaceTooLarge { width, height, max }),
        }
    }

    // =====================================================================
    // Loading
    // =====================================================================

    fn install(&mut self, image: SourceImage) {
        self.scheduler.cancel_all();
        self.surface = None;
        self.state = self.state.for_new_source();
        if let Some(old) = self.source.take()
            && let Some(handle) = old.backing
        {
            self.blobs.release(handle);
        }
        let (w, h) = image.dimensions();
        log::info!("Loaded {w}x{h} image from {:?}", image.origin);
        self.source = Some(image);
        self.scheduler.request_immediate();
    }

    /// Replace the source with already-decoded pixels.
    pub fn load(&mut self, pixels: RgbaImage, origin: SourceOrigin) {
        self.install(SourceImage::new(pixels, origin));
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, LoadError> {
        self.backend
            .decode(bytes)
            .map_err(|e| LoadError::Format(e.to_string()))
    }

    /// Decode an encoded image and make it the source.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let pixels = self.decode(bytes)?;
        self.load(pixels, SourceOrigin::Bytes);
        Ok(())
    }

    /// Fetch and decode `url`, with the resolver's single fallback.
    pub fn load_url<F: Fetch>(
        &mut self,
        resolver: &SourceResolver<F>,
        url: &str,
    ) -> Result<(), SessionError> {
        let url = validate_url(url)?;
        let pixels = resolver.resolve(&url, |bytes| self.decode(bytes))?;
        self.load(pixels, SourceOrigin::Url(url.to_string()));
        Ok(())
    }

    /// Normalize an uploaded file and make it the source. The recompressed
    /// file is kept as the image's backing blob until the next load.
    pub fn load_upload(
        &mut self,
        bytes: &[u8],
        mime: &str,
        name: &str,
    ) -> Result<(), SessionError> {
        let format = upload_format(mime)?;
        let upload = self.config.upload.to_upload_config();
        let prepared = prepare_upload(&self.backend, bytes, format, &upload)
            .map_err(|e| LoadError::Format(e.to_string()))?;
        let handle = self.blobs.register(prepared.bytes);
        self.install(SourceImage {
            pixels: prepared.pixels,
            backing: Some(handle),
            origin: SourceOrigin::Upload {
                name: name.to_string(),
            },
        });
        Ok(())
    }

    /// Read a local file and load it as an upload.
    pub fn load_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let mime = mime_for_path(path)
            .ok_or_else(|| ValidationError::UnsupportedFileType(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.load_upload(&bytes, mime, &name)
    }

    // =====================================================================
    // Edits
    // =====================================================================

    /// Apply one edit and schedule whatever render it needs.
    ///
    /// Invalid edits leave the state untouched.
    pub fn dispatch(&mut self, command: Command, now: Instant) -> Result<(), SessionError> {
        let next = apply(&self.state, &command)?;
        let Some(source) = self.source.as_ref() else {
            self.state = next;
            return Ok(());
        };
        self.check_surface(plan_dims(source, &next))?;
        self.state = next;
        match command.render_policy() {
            RenderPolicy::Debounced => self.scheduler.request_debounced(now),
            RenderPolicy::Immediate => self.scheduler.request_immediate(),
            RenderPolicy::Skip => {}
        }
        Ok(())
    }

    pub fn set_filter(
        &mut self,
        key: FilterKey,
        value: f32,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.dispatch(Command::Set(key, value), now)
    }

    pub fn set_format(&mut self, format: OutputFormat, now: Instant) -> Result<(), SessionError> {
        self.dispatch(Command::SetFormat(format), now)
    }

    pub fn apply_preset(&mut self, name: &str, now: Instant) -> Result<(), SessionError> {
        let preset: Preset = name.parse()?;
        self.dispatch(Command::Preset(preset), now)
    }

    pub fn set_custom_dimensions(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.dispatch(Command::CustomDimensions { width, height }, now)
    }

    pub fn reset(&mut self, now: Instant) -> Result<(), SessionError> {
        self.dispatch(Command::Reset, now)
    }

    // =====================================================================
    // Rendering
    // =====================================================================

    fn run_frame(&mut self, ticket: FrameTicket, now: Instant) -> Result<(), SessionError> {
        let Some(source) = self.source.as_ref() else {
            self.scheduler.abort_frame(ticket);
            return Err(SessionError::NoImage);
        };
        let (width, height) = plan_dims(source, &self.state);
        if let Err(e) = self.check_surface((width, height)) {
            self.scheduler.abort_frame(ticket);
            return Err(e.into());
        }
        let job = EnhancementJob {
            id: ticket.job,
            state: self.state.clone(),
            width,
            height,
        };

        let started = Instant::now();
        let pixels = match render_base(&self.backend, &source.pixels, &job.plan()) {
            Ok(pixels) => pixels,
            Err(e) => {
                self.scheduler.abort_frame(ticket);
                return Err(e.into());
            }
        };
        log::debug!(
            "job {} rendered {}x{} in {:?}",
            job.id.get(),
            width,
            height,
            started.elapsed()
        );

        let enhance = job.state.sharpness > 0.0;
        self.surface = Some(RenderSurface {
            pixels,
            job,
            sharpened: false,
        });
        self.scheduler.finish_frame(ticket, enhance, now);
        Ok(())
    }

    fn run_enhancement(&mut self, ticket: IdleTicket) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if surface.job.id != ticket.job || surface.sharpened {
            log::debug!("skipping stale sharpen for job {}", ticket.job.get());
            return false;
        }
        let started = Instant::now();
        surface.pixels = sharpen(&surface.pixels, surface.job.state.sharpness);
        surface.sharpened = true;
        log::debug!(
            "job {} sharpened in {:?}",
            ticket.job.get(),
            started.elapsed()
        );
        true
    }

    /// Advance timers, render a frame if one is due, and run the sharpening
    /// pass if the host is idle or its wait has run out.
    pub fn pump(&mut self, now: Instant, host_idle: bool) -> Result<PumpOutcome, SessionError> {
        let mut outcome = PumpOutcome::default();
        if self.scheduler.tick(now)
            && let Some(ticket) = self.scheduler.begin_frame()
        {
            self.run_frame(ticket, now)?;
            outcome.rendered = true;
        }
        if let Some(ticket) = self.scheduler.take_idle(now, host_idle) {
            outcome.sharpened = self.run_enhancement(ticket);
        }
        Ok(outcome)
    }

    /// Settle all pending work and return the surface for the current state.
    pub fn render(&mut self) -> Result<&RenderSurface, SessionError> {
        self.settle()?;
        self.surface.as_ref().ok_or(SessionError::NoImage)
    }

    fn settle(&mut self) -> Result<(), SessionError> {
        if self.source.is_none() {
            return Err(SessionError::NoImage);
        }
        let now = Instant::now();
        // A pending sharpening pass alone does not need a new frame.
        if self.surface.is_none() || self.scheduler.phase() != Phase::Idle {
            self.scheduler.request_immediate();
        }
        if let Some(ticket) = self.scheduler.begin_frame() {
            self.run_frame(ticket, now)?;
        }
        if let Some(ticket) = self.scheduler.take_idle(now, true) {
            self.run_enhancement(ticket);
        }
        Ok(())
    }

    // =====================================================================
    // Export
    // =====================================================================

    /// Encode the settled surface. State and surface are untouched on failure.
    pub fn encode(&mut self, format: OutputFormat, quality: f32) -> Result<EncodedOutput, SessionError> {
        self.encode_at(format, quality, Utc::now())
    }

    /// [`encode`](Self::encode) with an explicit timestamp for the filename.
    pub fn encode_at(
        &mut self,
        format: OutputFormat,
        quality: f32,
        at: DateTime<Utc>,
    ) -> Result<EncodedOutput, SessionError> {
        let quality = FilterKey::Quality.validate(quality)?;
        self.settle()?;
        let surface = self.surface.as_ref().ok_or(SessionError::NoImage)?;
        let output = encode_surface(
            &self.backend,
            &surface.pixels,
            format,
            Quality::new(quality),
            Quality::new(self.config.export.document_image_quality),
            at,
        )?;
        Ok(output)
    }

    /// Encode with the state's own format and quality.
    pub fn export(&mut self) -> Result<EncodedOutput, SessionError> {
        self.encode(self.state.format, self.state.quality)
    }
}
