//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Text
//!
//! ```text
//! Skipping duplicate content, already published: https://telegra.ph/Notes-01-01
//! ```
//!
//! ## Gallery
//!
//! ```text
//! Uploading Part 1/2 (100 images)...
//! Progress: |██████████████████████████████| 100.0% (100/100)
//! Warning: 2 images failed to upload.
//!   - 013.jpg: upload of 013.jpg failed after 3 attempts: ...
//!   - 077.png: upload of 077.png failed after 3 attempts: ...
//! Note: Navigation failed for parts: [2]. Content is still accessible.
//! ```
//!
//! ## Result
//!
//! ```text
//! Success! Page created: https://telegra.ph/Trip-01-01
//! ```
//!
//! # Architecture
//!
//! Each message has a `format_*` function (returns `String` or `Vec<String>`)
//! for testability. [`ConsoleObserver`] is the only thing here that writes to
//! stdout; the format functions are pure.

use crate::publish::PublishObserver;
use crate::session::LinkReport;
use std::io::Write;
use std::path::PathBuf;

const BAR_WIDTH: usize = 30;

pub fn format_part_header(part: usize, total: usize, images: usize) -> String {
    format!("Uploading Part {part}/{total} ({images} images)...")
}

/// One progress line, meant to be redrawn in place with `\r`.
///
/// ```text
/// Progress: |████████████------------------| 40.0% (2/5)
/// ```
pub fn format_progress_bar(completed: usize, total: usize) -> String {
    let total = total.max(1);
    let completed = completed.min(total);
    let filled = BAR_WIDTH * completed / total;
    let percent = completed as f64 / total as f64 * 100.0;
    format!(
        "Progress: |{}{}| {percent:.1}% ({completed}/{total})",
        "█".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

/// Failed uploads, by file name.
pub fn format_upload_failures(failures: &[(PathBuf, String)]) -> Vec<String> {
    if failures.is_empty() {
        return Vec::new();
    }
    let noun = if failures.len() == 1 { "image" } else { "images" };
    let mut lines = vec![format!(
        "Warning: {} {noun} failed to upload.",
        failures.len()
    )];
    for (path, error) in failures {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        lines.push(format!("  - {name}: {error}"));
    }
    lines
}

pub fn format_duplicate(url: &str) -> String {
    format!("Skipping duplicate content, already published: {url}")
}

pub fn format_link_report(report: &LinkReport) -> Option<String> {
    report.failure_note()
}

pub fn format_success(url: &str) -> String {
    format!("Success! Page created: {url}")
}

/// Prints publishing progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl PublishObserver for ConsoleObserver {
    fn part_started(&self, part: usize, total: usize, images: usize) {
        println!("{}", format_part_header(part, total, images));
    }

    fn upload_progress(&self, completed: usize, total: usize) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r{}", format_progress_bar(completed, total));
        if completed >= total {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }

    fn upload_failures(&self, failures: &[(PathBuf, String)]) {
        for line in format_upload_failures(failures) {
            println!("{line}");
        }
    }

    fn duplicate(&self, url: &str) {
        println!("{}", format_duplicate(url));
    }

    fn links_done(&self, report: &LinkReport) {
        if let Some(note) = format_link_report(report) {
            println!("{note}");
        }
    }
}
