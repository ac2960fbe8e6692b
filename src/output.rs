//! Output formatting and progress reporting.
//!
//! Provides a centralized interface for CLI output: colored status lines,
//! byte-size formatting, the end-of-run manifest, and the progress reporter
//! used by the move executor.

use crate::manifest::Manifest;
use crate::queue::MovePlan;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::IsTerminal;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count using the largest fitting binary unit.
///
/// The value is rounded to two decimals, ties to even, and always printed with
/// at least one decimal place.
///
/// # Examples
///
/// ```
/// use dirsweep::output::format_size;
///
/// assert_eq!(format_size(568320), "555.0 KB");
/// assert_eq!(format_size(595926712320), "555.0 GB");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(0), "0 bits");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 bits".to_string();
    }
    let mut unit = 0;
    while unit + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }
    let scaled = bytes as f64 / 1024u64.pow(unit as u32) as f64;
    let rounded = (scaled * 100.0).round_ties_even() / 100.0;
    // Debug keeps a trailing ".0" on whole numbers
    format!("{:?} {}", rounded, SIZE_UNITS[unit])
}

/// Receives byte-level progress from the move executor.
pub trait ProgressReporter {
    fn start(&mut self, total_bytes: u64, total_files: usize);
    fn advance(&mut self, bytes: u64, file_name: &str);
    fn finish(&mut self, message: &str);
}

/// Reports nothing.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn start(&mut self, _total_bytes: u64, _total_files: usize) {}
    fn advance(&mut self, _bytes: u64, _file_name: &str) {}
    fn finish(&mut self, _message: &str) {}
}

/// A byte-based terminal progress bar.
pub struct BarProgress {
    ascii: bool,
    bar: Option<ProgressBar>,
}

impl BarProgress {
    /// Returns a bar when stderr is a terminal, `None` otherwise.
    pub fn try_new(ascii: bool) -> Option<Self> {
        if !std::io::stderr().is_terminal() {
            return None;
        }
        Some(Self { ascii, bar: None })
    }

    fn style(ascii: bool) -> ProgressStyle {
        let (template, chars) = if ascii {
            ("{msg} [{bar:40}] {bytes}/{total_bytes} ({eta})", "#>-")
        } else {
            (
                "{msg} {spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                "█▓░",
            )
        };
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(chars)
    }
}

impl ProgressReporter for BarProgress {
    fn start(&mut self, total_bytes: u64, _total_files: usize) {
        let bar = ProgressBar::new(total_bytes);
        bar.set_style(Self::style(self.ascii));
        bar.set_message("> Moving Files");
        self.bar = Some(bar);
    }

    fn advance(&mut self, bytes: u64, file_name: &str) {
        if let Some(bar) = &self.bar {
            bar.inc(bytes);
            bar.set_message(format!("> {}", file_name));
        }
    }

    fn finish(&mut self, message: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(message.to_string());
        }
    }
}

/// Picks a progress reporter for the given settings, falling back to
/// [`NoopProgress`] when the bar is disabled or cannot be drawn.
pub fn progress_reporter(enabled: bool, ascii: bool) -> Box<dyn ProgressReporter> {
    if !enabled {
        return Box::new(NoopProgress);
    }
    match BarProgress::try_new(ascii) {
        Some(bar) => Box::new(bar),
        None => {
            tracing::debug!("stderr is not a terminal; progress bar disabled");
            Box::new(NoopProgress)
        }
    }
}

/// Manages all CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints the "N new files found totaling to X" line for a plan.
    pub fn plan_summary(plan: &MovePlan) {
        let noun = if plan.len() == 1 { "file" } else { "files" };
        Self::info(&format!(
            "> {} new {} found totaling to {}.",
            plan.len(),
            noun,
            format_size(plan.total_bytes)
        ));
        if plan.large_files > 0 {
            Self::warning(&format!(
                "{} large {} to transfer; give it time to prevent corruption.",
                plan.large_files,
                if plan.large_files == 1 { "file" } else { "files" }
            ));
        }
    }

    /// Prints how many planned files go to each destination.
    pub fn destination_table(plan: &MovePlan) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in plan.entries() {
            *counts
                .entry(entry.destination_dir.display().to_string())
                .or_insert(0) += 1;
        }

        Self::header("SUMMARY");
        let width = counts.keys().map(String::len).max().unwrap_or(0).max(11);
        println!("{:<width$} | {}", "Destination".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));
        for (dest, count) in &counts {
            println!(
                "{:<width$} | {} {}",
                dest,
                count.to_string().green(),
                if *count == 1 { "file" } else { "files" },
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} ({})",
            "Total".bold(),
            plan.len().to_string().green().bold(),
            format_size(plan.total_bytes),
            width = width
        );
    }

    /// Prints every moved file with its destination.
    pub fn manifest(manifest: &Manifest) {
        Self::header("File Manifest");
        for entry in &manifest.moved {
            println!(
                "\n> Name: {}\n  Dest: {}",
                entry.file_name,
                entry.destination.display()
            );
        }
    }

    /// Prints the entries that could not be moved.
    pub fn failures(manifest: &Manifest) {
        if manifest.failed.is_empty() {
            return;
        }
        Self::header("Failed Moves");
        for failed in &manifest.failed {
            Self::error(&format!("{}: {}", failed.file_name, failed.reason));
        }
    }
}
