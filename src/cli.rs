//! Command-line interface module for dropclear.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing (`clap`)
//! - Loading the configuration store
//! - Running scan, clean and archive through the [`Sweeper`]
//! - Rendering results, warnings and summaries

use crate::archiver::{ArchiveReport, ConflictPolicy};
use crate::cleaner::Cleaner;
use crate::config::{ConfigStore, ConfigUpdate, check_min_size, resolve_config_path};
use crate::filter::FilterCriteria;
use crate::output::{BarObserver, OutputFormatter, format_size};
use crate::progress::NoProgress;
use crate::record::{extension_of, folder_of};
use crate::sweeper::{ScanReport, Sweeper, pick_extensions};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Find stale, oversized files in your downloads folder and clean or archive them.
#[derive(Debug, Parser)]
#[command(name = "dropclear", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List files matching the criteria, grouped by folder.
    Scan {
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete files matching the criteria.
    Clean {
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Don't ask for confirmation.
        #[arg(short, long)]
        yes: bool,
        /// Show what would be deleted without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Move documents into the archive folder, keeping their folder layout.
    Archive {
        /// Extensions to archive (comma-separated). Defaults to the configured list.
        #[arg(short, long, value_delimiter = ',')]
        ext: Vec<String>,
        /// Archive into this folder instead of the configured one.
        #[arg(long, value_name = "DIR")]
        target: Option<PathBuf>,
        /// What to do when a file already exists in the archive.
        #[arg(long, value_enum, default_value_t = ConflictArg::Rename)]
        on_conflict: ConflictArg,
        /// Show what would be moved without moving anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Filter flags shared by scan and clean. Unset flags use the configuration.
#[derive(Debug, Args, Default)]
pub struct CriteriaArgs {
    /// Minimum file age in days.
    #[arg(long, value_name = "DAYS")]
    pub min_age: Option<u64>,
    /// Minimum file size in MB.
    #[arg(long, value_name = "MB", value_parser = parse_size_mb)]
    pub min_size: Option<f64>,
    /// Fuzzy search on file names and paths.
    #[arg(short, long)]
    pub pattern: Option<String>,
    /// Minimum fuzzy match score (0-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: Option<u8>,
    /// Include files whose name starts with a dot.
    #[arg(long)]
    pub include_hidden: bool,
    /// Additional extensions to exclude (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude_ext: Vec<String>,
    /// Additional folder names to exclude (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude_folder: Vec<String>,
}

impl CriteriaArgs {
    /// Overlays the flags on top of `base`.
    pub fn apply(&self, base: FilterCriteria) -> FilterCriteria {
        let mut criteria = base;
        if let Some(days) = self.min_age {
            criteria.min_age = days;
        }
        if let Some(size) = self.min_size {
            criteria.min_size = size;
        }
        if let Some(pattern) = &self.pattern {
            criteria.name_pattern = pattern.clone();
        }
        if let Some(threshold) = self.threshold {
            criteria.fuzzy_threshold = threshold;
        }
        criteria.include_hidden |= self.include_hidden;
        criteria
            .excluded_extensions
            .extend(self.exclude_ext.iter().cloned());
        criteria
            .excluded_folders
            .extend(self.exclude_folder.iter().cloned());
        criteria
    }
}

/// Parses a size threshold in MB, rejecting NaN, infinities and negatives.
fn parse_size_mb(value: &str) -> Result<f64, String> {
    let size: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    check_min_size(size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictArg {
    /// Keep both files, renaming the new one.
    Rename,
    /// Leave the file where it is.
    Skip,
    /// Replace the file in the archive.
    Overwrite,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Rename => ConflictPolicy::Rename,
            ConflictArg::Skip => ConflictPolicy::Skip,
            ConflictArg::Overwrite => ConflictPolicy::Overwrite,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current settings.
    Show,
    /// Change one or more settings.
    Set(SetArgs),
}

#[derive(Debug, Args)]
pub struct SetArgs {
    #[arg(long, value_name = "DIR")]
    pub downloads_path: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    pub archive_path: Option<PathBuf>,
    /// Default minimum size in MB.
    #[arg(long, value_name = "MB", value_parser = parse_size_mb)]
    pub min_size: Option<f64>,
    /// Default minimum age in days.
    #[arg(long, value_name = "DAYS")]
    pub max_age: Option<u64>,
    /// Excluded extensions (comma-separated, replaces the list).
    #[arg(long, value_delimiter = ',')]
    pub exclude_extensions: Option<Vec<String>>,
    /// Excluded folder names (comma-separated, replaces the list).
    #[arg(long, value_delimiter = ',')]
    pub exclude_folders: Option<Vec<String>>,
    /// Default archive extensions (comma-separated, replaces the list).
    #[arg(long, value_delimiter = ',')]
    pub archive_extensions: Option<Vec<String>>,
}

impl From<SetArgs> for ConfigUpdate {
    fn from(args: SetArgs) -> Self {
        ConfigUpdate {
            downloads_path: args.downloads_path,
            archive_path: args.archive_path,
            min_size_mb: args.min_size,
            max_age_days: args.max_age,
            exclude_extensions: args.exclude_extensions,
            exclude_folders: args.exclude_folders,
            archive_extensions: args.archive_extensions,
        }
    }
}

/// Runs a parsed command line.
///
/// This is the main entry point for CLI operations. Per-file failures are
/// printed and counted; only setup problems come back as `Err`.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dropclear::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["dropclear", "scan", "--min-age", "90"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<(), String> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let store = ConfigStore::open(&config_path)
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    run_with_store(cli.command, &store)
}

/// Runs `command` against an already opened store.
pub fn run_with_store(command: Command, store: &ConfigStore) -> Result<(), String> {
    for warning in store.warnings() {
        OutputFormatter::warning(&warning.to_string());
    }

    let sweeper = Sweeper::new(store);
    match command {
        Command::Scan { criteria, json } => scan(&sweeper, &criteria, json),
        Command::Clean {
            criteria,
            yes,
            dry_run,
        } => clean(&sweeper, &criteria, yes, dry_run),
        Command::Archive {
            ext,
            target,
            on_conflict,
            dry_run,
        } => archive(&sweeper, &ext, target.as_deref(), on_conflict.into(), dry_run),
        Command::Config { action } => match action {
            ConfigAction::Show => show_config(store),
            ConfigAction::Set(args) => {
                let update = ConfigUpdate::from(args);
                if update.is_empty() {
                    return Err("Nothing to update. See 'dropclear config set --help'.".to_string());
                }
                sweeper
                    .update_config(update)
                    .map_err(|e| format!("Error updating configuration: {}", e))?;
                OutputFormatter::success(&format!("Settings saved to {}", store.path().display()));
                Ok(())
            }
        },
    }
}

fn run_scan(sweeper: &Sweeper, args: &CriteriaArgs, quiet: bool) -> Result<ScanReport, String> {
    let criteria = args.apply(sweeper.default_criteria());
    let report = if quiet {
        sweeper.scan(&criteria, &NoProgress)
    } else {
        sweeper.scan(&criteria, &BarObserver::spinner("Scanning"))
    };
    report.map_err(|e| format!("Error: {}", e))
}

fn scan(sweeper: &Sweeper, args: &CriteriaArgs, json: bool) -> Result<(), String> {
    let report = run_scan(sweeper, args, json)?;

    if json {
        let text = serde_json::to_string_pretty(&report.grouped())
            .map_err(|e| format!("Error serializing results: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    print_scan_problems(&report);
    if report.records.is_empty() {
        OutputFormatter::info("No matching files found.");
        return Ok(());
    }
    print_scan_results(&report);
    Ok(())
}

fn clean(sweeper: &Sweeper, args: &CriteriaArgs, yes: bool, dry_run: bool) -> Result<(), String> {
    let report = run_scan(sweeper, args, false)?;
    print_scan_problems(&report);

    if report.records.is_empty() {
        OutputFormatter::info("No files to clean.");
        return Ok(());
    }
    print_scan_results(&report);

    if dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "{} files ({}) would be deleted. Nothing was changed.",
            report.records.len(),
            format_size(report.total_bytes())
        ));
        return Ok(());
    }

    if !yes
        && !confirm(&format!(
            "Delete {} files ({})?",
            report.records.len(),
            format_size(report.total_bytes())
        ))
    {
        OutputFormatter::info("Cancelled. No files were deleted.");
        return Ok(());
    }

    let observer = BarObserver::bar(report.records.len() as u64);
    let outcome = Cleaner::clean(&report.records, &observer);

    for failure in &outcome.failures {
        OutputFormatter::error(&failure.to_string());
    }
    OutputFormatter::success(&format!(
        "Deleted {} files, freed {}",
        outcome.deleted.len(),
        format_size(outcome.bytes_freed)
    ));
    if !outcome.is_complete_success() {
        OutputFormatter::warning(&format!(
            "{} files could not be deleted.",
            outcome.failures.len()
        ));
    }

    if !outcome.deleted.is_empty() {
        let failed: Vec<&Path> = outcome.failures.iter().map(|f| f.path.as_path()).collect();
        let mut by_folder: BTreeMap<String, usize> = BTreeMap::new();
        for record in report.records.iter().filter(|r| !failed.contains(&r.path.as_path())) {
            *by_folder.entry(record.folder()).or_insert(0) += 1;
        }
        OutputFormatter::summary_table("Folder", &by_folder, outcome.deleted.len());
    }
    Ok(())
}

fn archive(
    sweeper: &Sweeper,
    ext: &[String],
    target: Option<&Path>,
    conflict: ConflictPolicy,
    dry_run: bool,
) -> Result<(), String> {
    let config = sweeper.config();
    let extensions = pick_extensions(ext, &config);
    let archiver = sweeper.archiver(&config, target, conflict);

    if dry_run {
        let planned = archiver
            .plan(&extensions)
            .map_err(|e| format!("Error: {}", e))?;
        if planned.is_empty() {
            OutputFormatter::info("No files to archive.");
            return Ok(());
        }
        for path in &planned {
            OutputFormatter::plain(&format!(" - {}", path.display()));
        }
        OutputFormatter::dry_run_notice(&format!(
            "{} files would be archived. Nothing was changed.",
            planned.len()
        ));
        return Ok(());
    }

    OutputFormatter::info(&format!(
        "Archiving {} files from {}",
        extensions.join(", "),
        config.downloads_path.display()
    ));
    let observer = BarObserver::bar(0);
    let report = archiver
        .archive(&extensions, &observer)
        .map_err(|e| format!("Error: {}", e))?;

    print_archive_report(&report);
    Ok(())
}

fn print_archive_report(report: &ArchiveReport) {
    for failure in &report.failures {
        OutputFormatter::error(&failure.to_string());
    }
    for skipped in &report.skipped {
        OutputFormatter::warning(&format!(
            "Skipped {}: already in archive",
            skipped.display()
        ));
    }

    if report.moved.is_empty() {
        OutputFormatter::warning("No files were archived.");
        return;
    }

    for file in &report.moved {
        OutputFormatter::dim(&format!("Archived: {}", file.relative_path.display()));
    }
    OutputFormatter::success(&format!(
        "Archived {} files ({})",
        report.moved.len(),
        format_size(report.bytes_moved)
    ));

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_folder: BTreeMap<String, usize> = BTreeMap::new();
    for file in &report.moved {
        let ext = extension_of(&file.relative_path);
        let ext = if ext.is_empty() {
            "no extension".to_string()
        } else {
            format!(".{}", ext)
        };
        *by_type.entry(ext).or_insert(0) += 1;
        *by_folder.entry(folder_of(&file.relative_path)).or_insert(0) += 1;
    }
    OutputFormatter::summary_table("Type", &by_type, report.moved.len());
    OutputFormatter::summary_table("Folder", &by_folder, report.moved.len());
}

fn print_scan_problems(report: &ScanReport) {
    for skipped in &report.skipped_dirs {
        OutputFormatter::warning(&skipped.to_string());
    }
    for failure in &report.stat_failures {
        OutputFormatter::warning(&failure.to_string());
    }
}

fn print_scan_results(report: &ScanReport) {
    for (folder, records) in report.grouped() {
        OutputFormatter::header(&format!("📁 {}", folder));
        for record in records {
            OutputFormatter::plain(&format!(
                "  {:<40} {:>10} {:>6} days",
                record.name,
                format_size(record.size_bytes),
                record.age_days
            ));
        }
    }
    OutputFormatter::info(&format!(
        "\n{} of {} files matched, {} in total",
        report.records.len(),
        report.examined,
        format_size(report.total_bytes())
    ));
}

fn show_config(store: &ConfigStore) -> Result<(), String> {
    let config = store.snapshot();
    OutputFormatter::header(&format!("Settings ({})", store.path().display()));
    OutputFormatter::plain(&format!("Downloads path:      {}", config.downloads_path.display()));
    OutputFormatter::plain(&format!("Archive path:        {}", config.archive_path.display()));
    OutputFormatter::plain(&format!("Minimum size:        {} MB", config.min_size_mb));
    OutputFormatter::plain(&format!("Minimum age:         {} days", config.max_age_days));
    OutputFormatter::plain(&format!(
        "Excluded extensions: {}",
        config.exclude_extensions.join(", ")
    ));
    OutputFormatter::plain(&format!(
        "Excluded folders:    {}",
        config.exclude_folders.join(", ")
    ));
    OutputFormatter::plain(&format!(
        "Archive extensions:  {}",
        config.archive_extensions.join(", ")
    ));
    Ok(())
}

/// Asks a yes/no question on stdin. Anything but "y" or "yes" is a no.
fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_flags() {
        let cli = Cli::parse_from([
            "dropclear",
            "scan",
            "--min-age",
            "7",
            "--pattern",
            "invoice",
            "--exclude-ext",
            "iso,dmg",
        ]);
        match cli.command {
            Command::Scan { criteria, json } => {
                assert_eq!(criteria.min_age, Some(7));
                assert_eq!(criteria.pattern.as_deref(), Some("invoice"));
                assert_eq!(criteria.exclude_ext, vec!["iso", "dmg"]);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_criteria_args_overlay_base() {
        let base = FilterCriteria {
            min_age: 30,
            min_size: 50.0,
            excluded_extensions: ["zip".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let args = CriteriaArgs {
            min_size: Some(1.0),
            exclude_ext: vec!["iso".to_string()],
            include_hidden: true,
            ..Default::default()
        };

        let criteria = args.apply(base);
        assert_eq!(criteria.min_age, 30);
        assert_eq!(criteria.min_size, 1.0);
        assert!(criteria.include_hidden);
        assert!(criteria.excluded_extensions.contains("zip"));
        assert!(criteria.excluded_extensions.contains("iso"));
    }

    #[test]
    fn test_min_size_rejects_non_finite_and_negative() {
        for bad in ["nan", "inf", "-1", "lots"] {
            let flag = format!("--min-size={}", bad);
            assert!(Cli::try_parse_from(["dropclear", "scan", flag.as_str()]).is_err());
            assert!(Cli::try_parse_from(["dropclear", "clean", flag.as_str()]).is_err());
            assert!(Cli::try_parse_from(["dropclear", "config", "set", flag.as_str()]).is_err());
        }

        let cli = Cli::try_parse_from(["dropclear", "clean", "--min-size", "2.5"]).unwrap();
        match cli.command {
            Command::Clean { criteria, .. } => assert_eq!(criteria.min_size, Some(2.5)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_archive_defaults() {
        let cli = Cli::parse_from(["dropclear", "archive"]);
        match cli.command {
            Command::Archive {
                ext,
                on_conflict,
                dry_run,
                ..
            } => {
                assert!(ext.is_empty());
                assert_eq!(on_conflict, ConflictArg::Rename);
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
