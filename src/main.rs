use clap::{Parser, Subcommand};
use image_enhancer::config::{self, DEFAULT_CONFIG_FILE, EnhancerConfig};
use image_enhancer::imaging::RustBackend;
use image_enhancer::output::{self, StatusView};
use image_enhancer::repl;
use image_enhancer::session::{Session, SessionError};
use image_enhancer::source::{HttpFetcher, SourceResolver};
use image_enhancer::state::{Command as Edit, FilterKey, OutputFormat};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "image-enhancer")]
#[command(about = "Scale, color-correct, sharpen and export a raster image")]
#[command(long_about = "\
Scale, color-correct, sharpen and export a raster image

SOURCE is either an http(s) URL ending in .jpg, .jpeg, .png, .gif, .bmp or
.webp, or a path to a local image file. Local files larger than the
configured maximum (2000px by default) are downsampled on load.

Adjustments are multipliers where 1.0 leaves the image unchanged:

  --brightness 1.2     20% brighter
  --contrast 0.8       flatter
  --saturation 0       grayscale
  --sharpness 0.5      unsharp mask strength, 0 to 1

Presets set brightness, contrast and saturation in one step; explicit flags
are applied after the preset and win.

Run 'image-enhancer gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Adjustments applied before export.
#[derive(clap::Args, Clone)]
struct AdjustArgs {
    /// Apply a preset first (none, vintage, blackwhite, sepia, vibrant)
    #[arg(long)]
    preset: Option<String>,
    /// Scale factor, e.g. 0.5 for half size
    #[arg(long)]
    scale: Option<f32>,
    #[arg(long)]
    brightness: Option<f32>,
    #[arg(long)]
    contrast: Option<f32>,
    #[arg(long)]
    saturation: Option<f32>,
    /// Sharpening strength, 0 to 1
    #[arg(long)]
    sharpness: Option<f32>,
    /// Output width in pixels; height follows the aspect ratio unless given
    #[arg(long)]
    width: Option<u32>,
    /// Output height in pixels; width follows the aspect ratio unless given
    #[arg(long)]
    height: Option<u32>,
    /// Output format (jpeg, png, webp, pdf); defaults to the config value
    #[arg(long)]
    format: Option<OutputFormat>,
    /// JPEG quality, in (0, 1]
    #[arg(long)]
    quality: Option<f32>,
}

impl AdjustArgs {
    /// Edits in application order: preset first, then individual values.
    fn edits(&self) -> Result<Vec<Edit>, SessionError> {
        let mut edits = Vec::new();
        if let Some(name) = &self.preset {
            edits.push(Edit::Preset(name.parse()?));
        }
        let values = [
            (FilterKey::Scale, self.scale),
            (FilterKey::Brightness, self.brightness),
            (FilterKey::Contrast, self.contrast),
            (FilterKey::Saturation, self.saturation),
            (FilterKey::Sharpness, self.sharpness),
            (FilterKey::Quality, self.quality),
        ];
        for (key, value) in values {
            if let Some(value) = value {
                edits.push(Edit::Set(key, value));
            }
        }
        if self.width.is_some() || self.height.is_some() {
            edits.push(Edit::CustomDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if let Some(format) = self.format {
            edits.push(Edit::SetFormat(format));
        }
        Ok(edits)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Enhance one image and write the result
    Enhance {
        /// Image URL or local file
        source: String,
        #[command(flatten)]
        adjust: AdjustArgs,
        /// Directory to write the result into
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
    },
    /// Load an image and edit it interactively, one command per line
    Repl {
        /// Image URL or local file
        source: String,
        /// Default directory for 'export'
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
    },
    /// List the available presets
    Presets,
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Enhance {
            source,
            adjust,
            output,
        } => {
            let mut session = open_session(&cli.config, &source)?;
            for edit in adjust.edits()? {
                session.dispatch(edit, Instant::now())?;
            }
            session.render()?;
            print_session_status(&session);

            let encoded = session.export()?;
            std::fs::create_dir_all(&output)?;
            let path = encoded.write_to(&output)?;
            output::print_export(&encoded, &path);
        }
        Command::Repl { source, output } => {
            let mut session = open_session(&cli.config, &source)?;
            session.render()?;
            print_session_status(&session);
            let stdin = std::io::stdin();
            repl::run(&mut session, stdin.lock(), std::io::stdout(), &output)?;
        }
        Command::Presets => output::print_presets(),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn is_url(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Load config and the source image into a fresh session.
fn open_session(
    config_path: &Path,
    source: &str,
) -> Result<Session<RustBackend>, Box<dyn std::error::Error>> {
    let config: EnhancerConfig = config::load_config(config_path)?;
    let backend = RustBackend::with_filter(config.render.resample.to_filter_type());
    let fallback_prefix = config.source.fallback_prefix.clone();
    let timeout = config.source.timeout();
    let mut session = Session::new(backend, config);

    let loaded = if is_url(source) {
        let resolver = SourceResolver::new(HttpFetcher::new(timeout)?, fallback_prefix);
        session.load_url(&resolver, source)
    } else {
        session.load_file(Path::new(source))
    };
    if let Err(SessionError::Load(e)) = &loaded {
        log::error!("{}", e.user_message());
    }
    loaded?;
    Ok(session)
}

fn print_session_status(session: &Session<RustBackend>) {
    output::print_status(&StatusView {
        original: session.source().map(|s| s.dimensions()),
        enhanced: session.surface().map(|s| s.dimensions()),
        state: session.state(),
    });
}
