//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables. The core library never prints; the
//! CLI routes everything through here.

use crate::progress::{Progress, ProgressObserver};
use crate::record::BYTES_PER_MB;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for operations
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dropclear::output::OutputFormatter;
    /// OutputFormatter::success("Deleted 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message.yellow());
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a dimmed message.
    pub fn dim(message: &str) {
        println!("{}", message.dimmed());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for batch operations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dropclear::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Creates a spinner for work of unknown length, such as a directory walk.
    pub fn create_spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix} {pos} files {msg}")
                .expect("Invalid spinner template"),
        );
        pb.set_prefix(message.to_string());
        pb
    }

    /// Prints a two-column table of counts with a total row.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dropclear::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Root".to_string(), 15);
    /// counts.insert("installers".to_string(), 8);
    /// OutputFormatter::summary_table("Folder", &counts, 23);
    /// ```
    pub fn summary_table(label: &str, counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = counts
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
            .max(label.len())
            .max(5);

        println!("{:<width$} | {}", label.bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));

        for (name, count) in counts {
            println!(
                "{:<width$} | {} {}",
                name,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Human-readable size, in MB below one gigabyte and GB above.
pub fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / BYTES_PER_MB;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else {
        format!("{:.1} MB", mb)
    }
}

/// Feeds core progress updates into an `indicatif` bar.
pub struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    /// A spinner for walks, where the total is unknown.
    pub fn spinner(message: &str) -> Self {
        Self {
            bar: OutputFormatter::create_spinner(message),
        }
    }

    /// A bar for batches of `total` items.
    pub fn bar(total: u64) -> Self {
        Self {
            bar: OutputFormatter::create_progress_bar(total),
        }
    }
}

impl ProgressObserver for BarObserver {
    fn on_progress(&self, progress: Progress) {
        if let Some(total) = progress.total_items {
            self.bar.set_length(total);
        }
        self.bar.set_position(progress.items_done);
        self.bar.set_message(format_size(progress.bytes_done));
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(format_size(0), "0.0 MB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }

    #[test]
    fn test_format_size_gigabytes() {
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "file");
        assert_eq!(plural(0), "files");
        assert_eq!(plural(2), "files");
    }
}
