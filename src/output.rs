//! CLI output formatting for both importers.
//!
//! # Information-First Display
//!
//! Every imported entity is shown by what it *is* (the hike's route, the
//! post's archive slot) with the file it came from as secondary context on
//! indented `Source:` lines. Skipped items follow in their own section with
//! the reason, so a run's output doubles as a to-do list.
//!
//! # Output Format
//!
//! ## Hikes
//!
//! ```text
//! Hikes
//! 001 Yelverton, Devon → Princetown, Devon
//!     Source: 2024/walk.gpx
//!     Start: 2024-05-01T10:00:00Z
//!     12.41 km, 402.00m ascent, 398.50m descent in 4h05m30s (moving 3h12m00s)
//!     Map: 2024-05-01T10:00:00Z_map.png
//!     Record: 2024-05-01T10:00:00Z_hike.json
//!
//! Skipped
//! 001 broken.gpx
//!     Reason: track has no timestamps
//!
//! Imported 1 hike, skipped 1 of 2
//! ```
//!
//! ## Posts
//!
//! ```text
//! Posts
//! 001 2024/05/01/abc123
//!     Source: abc123.json
//!
//! Imported 1 post, skipped 0 of 1
//! ```
//!
//! # Architecture
//!
//! Each importer has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::hike::{HikeSummary, format_duration};
use crate::import::ImportSummary;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` when it lies below it, with `/` separators.
fn display_relative(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

/// `1 hike`, `2 hikes`.
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn push_skipped<'a>(lines: &mut Vec<String>, skipped: impl Iterator<Item = (String, &'a str)>) {
    let mut header = false;
    for (i, (label, reason)) in skipped.enumerate() {
        if !header {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push("Skipped".to_string());
            header = true;
        }
        lines.push(format!("{} {}", format_index(i + 1), label));
        lines.push(format!("{}Reason: {}", indent(1), reason));
    }
}

// ============================================================================
// Hikes
// ============================================================================

/// Format a hike import run. Sources are shown relative to `input_dir`,
/// output files relative to `output_dir`.
pub fn format_hike_output(summary: &HikeSummary, input_dir: &Path, output_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !summary.imported.is_empty() {
        lines.push("Hikes".to_string());
    }
    for (i, hike) in summary.imported.iter().enumerate() {
        let record = &hike.record;
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            record.start_location,
            record.end_location
        ));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_relative(&hike.source, input_dir)
        ));
        lines.push(format!("{}Start: {}", indent(1), record.stem()));
        lines.push(format!(
            "{}{:.2} km, {:.2}m ascent, {:.2}m descent in {} (moving {})",
            indent(1),
            record.distance_meters / 1000.0,
            record.ascent,
            record.descent,
            format_duration(record.time_taken_secs),
            format_duration(record.moving_time_secs.round() as i64)
        ));
        lines.push(format!(
            "{}Map: {}",
            indent(1),
            display_relative(&hike.map_path, output_dir)
        ));
        lines.push(format!(
            "{}Record: {}",
            indent(1),
            display_relative(&hike.record_path, output_dir)
        ));
    }

    push_skipped(
        &mut lines,
        summary
            .skipped
            .iter()
            .map(|s| (display_relative(&s.path, input_dir), s.reason.as_str())),
    );

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Imported {}, skipped {} of {}",
        count(summary.imported.len(), "hike"),
        summary.skipped.len(),
        summary.found
    ));
    lines
}

pub fn print_hike_output(summary: &HikeSummary, input_dir: &Path, output_dir: &Path) {
    for line in format_hike_output(summary, input_dir, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Format a post import run. Posts are identified by their archive
/// directory relative to `output_root`.
pub fn format_post_output(summary: &ImportSummary, output_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !summary.imported.is_empty() {
        lines.push("Posts".to_string());
    }
    for (i, post) in summary.imported.iter().enumerate() {
        let slot = post.path.parent().unwrap_or(&post.path);
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            display_relative(slot, output_root)
        ));
        lines.push(format!("{}Source: {}", indent(1), post.key));
    }

    push_skipped(
        &mut lines,
        summary
            .skipped
            .iter()
            .map(|s| (s.key.clone(), s.reason.as_str())),
    );

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Imported {}, skipped {} of {}",
        count(summary.imported.len(), "post"),
        summary.skipped.len(),
        summary.listed
    ));
    lines
}

pub fn print_post_output(summary: &ImportSummary, output_root: &Path) {
    for line in format_post_output(summary, output_root) {
        println!("{}", line);
    }
}
