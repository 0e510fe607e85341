//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Status
//!
//! ```text
//! Original: 800 × 600px
//! Enhanced: 400 × 300px
//!     Scale: 0.5x
//!     Brightness: 110%
//!     Contrast: 120%
//!     Saturation: 80%
//!     Sharpness: 0%
//!     Tone: sepia
//! Export: jpeg @ 85%
//! ```
//!
//! ## Presets
//!
//! ```text
//! none        reset every adjustment to its default
//! vintage     warm, slightly faded contrast
//! ```
//!
//! ## Export
//!
//! ```text
//! Saved image-1700000000123.jpeg (image/jpeg, 48.2 KB)
//!     Path: out/image-1700000000123.jpeg
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::export::EncodedOutput;
use crate::imaging::Tone;
use crate::presets::Preset;
use crate::scheduler::SchedulerStats;
use crate::state::FilterState;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_size((w, h): (u32, u32)) -> String {
    format!("{w} × {h}px")
}

fn percent(value: f32) -> String {
    format!("{}%", (value * 100.0).round() as i64)
}

fn format_bytes(len: usize) -> String {
    match len {
        n if n >= 1024 * 1024 => format!("{:.1} MB", n as f64 / (1024.0 * 1024.0)),
        n if n >= 1024 => format!("{:.1} KB", n as f64 / 1024.0),
        n => format!("{n} B"),
    }
}

/// Everything the status view shows, gathered from a session.
#[derive(Debug, Clone)]
pub struct StatusView<'a> {
    pub original: Option<(u32, u32)>,
    pub enhanced: Option<(u32, u32)>,
    pub state: &'a FilterState,
}

pub fn format_status(view: &StatusView<'_>) -> Vec<String> {
    let state = view.state;
    let mut lines = Vec::new();
    match view.original {
        Some(dims) => lines.push(format!("Original: {}", format_size(dims))),
        None => lines.push("Original: (no image loaded)".to_string()),
    }
    if let Some(dims) = view.enhanced {
        lines.push(format!("Enhanced: {}", format_size(dims)));
    }
    lines.push(format!("{}Scale: {:.1}x", indent(1), state.scale));
    if state.custom_width.is_some() || state.custom_height.is_some() {
        let side = |v: Option<u32>| v.map_or_else(|| "auto".to_string(), |v| v.to_string());
        lines.push(format!(
            "{}Size: {} × {}",
            indent(1),
            side(state.custom_width),
            side(state.custom_height)
        ));
    }
    lines.push(format!("{}Brightness: {}", indent(1), percent(state.brightness)));
    lines.push(format!("{}Contrast: {}", indent(1), percent(state.contrast)));
    lines.push(format!("{}Saturation: {}", indent(1), percent(state.saturation)));
    lines.push(format!("{}Sharpness: {}", indent(1), percent(state.sharpness)));
    if state.tone != Tone::None {
        lines.push(format!("{}Tone: {}", indent(1), state.tone));
    }
    if state.format.uses_quality() {
        lines.push(format!("Export: {} @ {}", state.format, percent(state.quality)));
    } else {
        lines.push(format!("Export: {}", state.format));
    }
    lines
}

pub fn print_status(view: &StatusView<'_>) {
    for line in format_status(view) {
        println!("{}", line);
    }
}

pub fn format_presets() -> Vec<String> {
    let width = Preset::ALL
        .iter()
        .map(|p| p.name().len())
        .max()
        .unwrap_or(0);
    Preset::ALL
        .iter()
        .map(|p| format!("{:<width$}  {}", p.name(), p.description()))
        .collect()
}

pub fn print_presets() {
    for line in format_presets() {
        println!("{}", line);
    }
}

pub fn format_export(output: &EncodedOutput, path: &Path) -> Vec<String> {
    vec![
        format!(
            "Saved {} ({}, {})",
            output.filename,
            output.mime,
            format_bytes(output.bytes.len())
        ),
        format!("{}Path: {}", indent(1), path.display()),
    ]
}

pub fn print_export(output: &EncodedOutput, path: &Path) {
    for line in format_export(output, path) {
        println!("{}", line);
    }
}

/// One-line render counters, shown after a session ends.
pub fn format_stats(stats: &SchedulerStats) -> String {
    format!(
        "Renders: {} ({} requests, {} coalesced), sharpen passes: {} run, {} dropped",
        stats.frames_rendered,
        stats.requested,
        stats.coalesced,
        stats.enhancements_run,
        stats.enhancements_dropped
    )
}
