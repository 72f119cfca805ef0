//! The operations a front end calls: scan, clean, archive and update_config.
//!
//! A [`Sweeper`] borrows the [`ConfigStore`] instead of reaching for global
//! state, and every operation takes its inputs explicitly, so the whole
//! pipeline runs the same from the CLI, from tests or from any other caller.

use crate::archiver::{ArchiveError, ArchiveReport, Archiver, ConflictPolicy};
use crate::cleaner::{CleanReport, Cleaner};
use crate::config::{Config, ConfigError, ConfigStore, ConfigUpdate};
use crate::filter::{FilterCriteria, filter};
use crate::progress::{ProgressObserver, Tracker};
use crate::record::{FileRecord, StatError, extract};
use crate::walker::{self, TraversalError};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors that abort a scan before it starts.
#[derive(Debug)]
pub enum ScanError {
    /// The scan root is missing or not a directory.
    InvalidRoot { path: PathBuf },
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot { path } => {
                write!(f, "Scan directory {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Result of one scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Records that passed the filter, in walk order.
    pub records: Vec<FileRecord>,
    /// Number of files examined before filtering.
    pub examined: usize,
    /// Subtrees that could not be read.
    pub skipped_dirs: Vec<TraversalError>,
    /// Files whose metadata could not be read.
    pub stat_failures: Vec<StatError>,
}

impl ScanReport {
    /// Records grouped by their folder relative to the scan root.
    ///
    /// Files in the root itself are grouped under [`crate::record::ROOT_GROUP`].
    pub fn grouped(&self) -> BTreeMap<String, Vec<&FileRecord>> {
        let mut groups: BTreeMap<String, Vec<&FileRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.folder()).or_default().push(record);
        }
        groups
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size_bytes).sum()
    }
}

/// Outcome of [`Sweeper::clean`]: what was found and what was deleted.
#[derive(Debug)]
pub struct CleanOutcome {
    pub scan: ScanReport,
    pub clean: CleanReport,
}

/// Runs the scan → filter → action pipeline against a configuration.
pub struct Sweeper<'a> {
    store: &'a ConfigStore,
}

impl<'a> Sweeper<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    /// A copy of the settings in effect.
    pub fn config(&self) -> Config {
        self.store.snapshot()
    }

    /// Criteria for a clean with the configured defaults.
    pub fn default_criteria(&self) -> FilterCriteria {
        self.config().criteria()
    }

    /// Scans the configured downloads folder.
    pub fn scan(
        &self,
        criteria: &FilterCriteria,
        observer: &dyn ProgressObserver,
    ) -> Result<ScanReport, ScanError> {
        scan_dir(&self.config().downloads_path, criteria, observer)
    }

    /// Scans with the default criteria and deletes everything found.
    pub fn clean(&self, observer: &dyn ProgressObserver) -> Result<CleanOutcome, ScanError> {
        let scan = self.scan(&self.default_criteria(), observer)?;
        let clean = Cleaner::clean(&scan.records, observer);
        Ok(CleanOutcome { scan, clean })
    }

    /// Archives files by extension into the configured archive folder.
    ///
    /// An empty `extensions` list uses the configured archive extensions.
    pub fn archive(
        &self,
        extensions: &[String],
        conflict: ConflictPolicy,
        observer: &dyn ProgressObserver,
    ) -> Result<ArchiveReport, ArchiveError> {
        let config = self.config();
        self.archiver(&config, None, conflict)
            .archive(&pick_extensions(extensions, &config), observer)
    }

    /// Builds the archiver for `config`, optionally redirected to `target`.
    pub fn archiver(
        &self,
        config: &Config,
        target: Option<&Path>,
        conflict: ConflictPolicy,
    ) -> Archiver {
        let target = target
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.archive_path.clone());
        Archiver::new(&config.downloads_path, target).with_conflict_policy(conflict)
    }

    /// Applies and persists a settings change.
    pub fn update_config(&self, update: ConfigUpdate) -> Result<Config, ConfigError> {
        self.store.update(update)
    }
}

/// The caller's extensions, or the configured ones when none are given.
pub fn pick_extensions(extensions: &[String], config: &Config) -> Vec<String> {
    if extensions.is_empty() {
        config.archive_extensions.clone()
    } else {
        extensions.to_vec()
    }
}

/// Walks `root`, extracts metadata for every file and filters the records.
///
/// Files that vanish or can't be read are skipped and reported, never fatal.
/// All ages are measured against the moment the scan started.
pub fn scan_dir(
    root: &Path,
    criteria: &FilterCriteria,
    observer: &dyn ProgressObserver,
) -> Result<ScanReport, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::InvalidRoot {
            path: root.to_path_buf(),
        });
    }

    let mut report = ScanReport::default();
    let mut walk = walker::walk(root);
    let records = extract_all(walk.by_ref(), root, &mut report, observer);

    report.skipped_dirs = walk.into_skipped();
    report.examined = records.len();
    report.records = filter(records, criteria);

    info!(
        root = %root.display(),
        examined = report.examined,
        matched = report.records.len(),
        "scan finished"
    );
    Ok(report)
}

/// Builds a record for every path, collecting stat failures in `report`.
///
/// Ages are measured against a single instant taken before the first path.
fn extract_all(
    paths: impl Iterator<Item = PathBuf>,
    root: &Path,
    report: &mut ScanReport,
    observer: &dyn ProgressObserver,
) -> Vec<FileRecord> {
    let now = Utc::now();
    let mut records = Vec::new();
    let mut tracker = Tracker::new(observer, None);

    for path in paths {
        match extract(&path, root, now) {
            Ok(record) => {
                tracker.advance(record.size_bytes);
                records.push(record);
            }
            Err(err) => {
                debug!("{}", err);
                report.stat_failures.push(err);
            }
        }
    }
    tracker.finish();
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::progress::tests::Recorder;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_dir_invalid_root() {
        let result = scan_dir(
            Path::new("/non/existent/path"),
            &FilterCriteria::default(),
            &NoProgress,
        );
        assert!(matches!(result, Err(ScanError::InvalidRoot { .. })));
    }

    #[test]
    fn test_scan_groups_by_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("photos/2023")).unwrap();
        fs::write(root.join("top.txt"), "a").unwrap();
        fs::write(root.join("photos/2023/beach.jpg"), "b").unwrap();
        fs::write(root.join("photos/2023/hike.jpg"), "c").unwrap();

        let report = scan_dir(root, &FilterCriteria::default(), &NoProgress).unwrap();
        let groups = report.grouped();

        assert_eq!(report.examined, 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Root"].len(), 1);
        let nested = Path::new("photos").join("2023");
        assert_eq!(groups[&*nested.to_string_lossy()].len(), 2);
        assert_eq!(report.total_bytes(), 3);
    }

    #[test]
    fn test_vanished_file_is_skipped_and_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("kept.txt"), "abc").unwrap();
        let paths = vec![root.join("kept.txt"), root.join("vanished.txt")];
        let recorder = Recorder::default();
        let mut report = ScanReport::default();

        let records = extract_all(paths.into_iter(), root, &mut report, &recorder);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "kept.txt");
        assert_eq!(report.stat_failures.len(), 1);
        assert_eq!(report.stat_failures[0].path, root.join("vanished.txt"));
        // Only readable files count towards progress.
        assert_eq!(recorder.updates.borrow().len(), 1);
        assert!(*recorder.finished.borrow());
    }

    #[test]
    fn test_pick_extensions_falls_back_to_config() {
        let config = Config {
            archive_extensions: vec!["odt".to_string()],
            ..Config::default()
        };
        assert_eq!(pick_extensions(&[], &config), vec!["odt"]);
        assert_eq!(
            pick_extensions(&["pdf".to_string()], &config),
            vec!["pdf"]
        );
    }
}
