//! Line-oriented interactive front end.
//!
//! Each input line is one command:
//!
//! ```text
//! set <key> <value>     scale | brightness | contrast | saturation | sharpness | quality
//! preset <name>         none | vintage | blackwhite | sepia | vibrant
//! size <w|-> <h|->      custom dimensions, `-` leaves that side automatic
//! format <fmt>          jpeg | png | webp | pdf
//! reset
//! status
//! presets
//! export [dir]
//! help
//! quit
//! ```
//!
//! The loop is generic over reader and writer so it can be driven from tests.

use crate::imaging::ImageBackend;
use crate::output::{StatusView, format_export, format_presets, format_stats, format_status};
use crate::presets::Preset;
use crate::session::Session;
use crate::state::{Command, FilterKey, OutputFormat, ValidationError};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ReplError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("Unknown command '{0}' (try 'help')")]
    UnknownCommand(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Edit(Command),
    Status,
    Presets,
    Export(Option<PathBuf>),
    Help,
    Quit,
}

const HELP: &str = "\
set <key> <value>   adjust scale, brightness, contrast, saturation, sharpness or quality
preset <name>       apply a preset (see 'presets')
size <w|-> <h|->    set custom output dimensions, '-' for automatic
format <fmt>        jpeg, png, webp or pdf
reset               restore default adjustments
status              show sizes and current settings
export [dir]        save the enhanced image
quit                leave";

fn parse_dimension(token: &str) -> Result<Option<u32>, ReplError> {
    match token {
        "-" | "auto" => Ok(None),
        _ => token
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ReplError::Usage("size <w|-> <h|->")),
    }
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, ReplError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let command = match tokens.as_slice() {
        ["set", key, value] => {
            let key: FilterKey = key.parse()?;
            let value: f32 = value
                .parse()
                .map_err(|_| ReplError::Usage("set <key> <number>"))?;
            ReplCommand::Edit(Command::Set(key, value))
        }
        ["set", ..] => return Err(ReplError::Usage("set <key> <number>")),
        ["preset", name] => ReplCommand::Edit(Command::Preset(name.parse::<Preset>()?)),
        ["preset", ..] => return Err(ReplError::Usage("preset <name>")),
        ["size", w, h] => ReplCommand::Edit(Command::CustomDimensions {
            width: parse_dimension(w)?,
            height: parse_dimension(h)?,
        }),
        ["size", ..] => return Err(ReplError::Usage("size <w|-> <h|->")),
        ["format", fmt] => ReplCommand::Edit(Command::SetFormat(fmt.parse::<OutputFormat>()?)),
        ["format", ..] => return Err(ReplError::Usage("format <jpeg|png|webp|pdf>")),
        ["reset"] => ReplCommand::Edit(Command::Reset),
        ["status"] => ReplCommand::Status,
        ["presets"] => ReplCommand::Presets,
        ["export"] => ReplCommand::Export(None),
        ["export", dir] => ReplCommand::Export(Some(PathBuf::from(dir))),
        ["help" | "?"] => ReplCommand::Help,
        ["quit" | "exit" | "q"] => ReplCommand::Quit,
        [other, ..] => return Err(ReplError::UnknownCommand(other.to_string())),
        [] => return Ok(None),
    };
    Ok(Some(command))
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn write_status<B: ImageBackend>(session: &mut Session<B>, out: &mut impl Write) -> io::Result<()> {
    if let Err(e) = session.render() {
        log::debug!("status without a settled surface: {e}");
    }
    let view = StatusView {
        original: session.source().map(|s| s.dimensions()),
        enhanced: session.surface().map(|s| s.dimensions()),
        state: session.state(),
    };
    write_lines(out, &format_status(&view))
}

/// Read commands until `quit` or end of input. Command errors are reported
/// on `out` and the loop continues; only I/O errors end it early.
pub fn run<B: ImageBackend>(
    session: &mut Session<B>,
    input: impl BufRead,
    mut out: impl Write,
    export_dir: &Path,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };

        match command {
            ReplCommand::Edit(edit) => {
                let now = Instant::now();
                if let Err(e) = session.dispatch(edit, now) {
                    writeln!(out, "error: {e}")?;
                    continue;
                }
                // A line-driven host is idle between lines.
                if let Err(e) = session.pump(now, true) {
                    writeln!(out, "error: {e}")?;
                }
            }
            ReplCommand::Status => write_status(session, &mut out)?,
            ReplCommand::Presets => write_lines(&mut out, &format_presets())?,
            ReplCommand::Export(dir) => {
                let dir = dir.as_deref().unwrap_or(export_dir);
                match session.export() {
                    Ok(encoded) => {
                        std::fs::create_dir_all(dir)?;
                        let path = encoded.write_to(dir)?;
                        write_lines(&mut out, &format_export(&encoded, &path))?;
                    }
                    Err(e) => writeln!(out, "error: {e}")?,
                }
            }
            ReplCommand::Help => writeln!(out, "{HELP}")?,
            ReplCommand::Quit => break,
        }
    }
    log::info!("{}", format_stats(session.stats()));
    Ok(())
}
