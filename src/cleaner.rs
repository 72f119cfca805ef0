/// Bulk deletion of scanned files.
///
/// Deletion is best-effort: a file that is locked, protected or already gone
/// is recorded as a failure and the batch moves on. There is no rollback.
use crate::progress::{ProgressObserver, Tracker};
use crate::record::FileRecord;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// A file that could not be deleted.
#[derive(Debug)]
pub struct DeleteError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for DeleteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to delete {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for DeleteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Outcome of a clean pass.
#[derive(Debug, Default)]
pub struct CleanReport {
    /// Names of the files that were deleted, in input order.
    pub deleted: Vec<String>,
    /// Files that could not be deleted.
    pub failures: Vec<DeleteError>,
    /// Total size of the deleted files.
    pub bytes_freed: u64,
}

impl CleanReport {
    /// Returns true if every file was deleted.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deletes record sets.
pub struct Cleaner;

impl Cleaner {
    /// Deletes every file in `records`, continuing past individual failures.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dropclear::cleaner::Cleaner;
    /// use dropclear::progress::NoProgress;
    ///
    /// let report = Cleaner::clean(&[], &NoProgress);
    /// assert!(report.deleted.is_empty());
    /// ```
    pub fn clean(records: &[FileRecord], observer: &dyn ProgressObserver) -> CleanReport {
        let mut report = CleanReport::default();
        let mut tracker = Tracker::new(observer, Some(records.len() as u64));

        for record in records {
            match fs::remove_file(&record.path) {
                Ok(()) => {
                    report.deleted.push(record.name.clone());
                    report.bytes_freed += record.size_bytes;
                    tracker.advance(record.size_bytes);
                }
                Err(source) => {
                    let err = DeleteError {
                        path: record.path.clone(),
                        source,
                    };
                    debug!("{}", err);
                    report.failures.push(err);
                    tracker.advance(0);
                }
            }
        }
        tracker.finish();

        info!(
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            bytes = report.bytes_freed,
            "clean finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::progress::tests::Recorder;
    use crate::record::extract;
    use chrono::Utc;
    use tempfile::TempDir;

    fn records_for(temp_dir: &TempDir, names: &[&str]) -> Vec<FileRecord> {
        let now = Utc::now();
        names
            .iter()
            .map(|name| {
                let path = temp_dir.path().join(name);
                fs::write(&path, "content").expect("Failed to write test file");
                extract(&path, temp_dir.path(), now).expect("Failed to stat test file")
            })
            .collect()
    }

    #[test]
    fn test_clean_deletes_all_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let records = records_for(&temp_dir, &["a.log", "b.log"]);

        let report = Cleaner::clean(&records, &NoProgress);

        assert_eq!(report.deleted, vec!["a.log", "b.log"]);
        assert!(report.is_complete_success());
        assert_eq!(report.bytes_freed, 14);
        assert!(!temp_dir.path().join("a.log").exists());
        assert!(!temp_dir.path().join("b.log").exists());
    }

    #[test]
    fn test_clean_continues_past_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let records = records_for(&temp_dir, &["a.log", "gone.log", "c.log"]);
        fs::remove_file(temp_dir.path().join("gone.log")).unwrap();

        let report = Cleaner::clean(&records, &NoProgress);

        assert_eq!(report.deleted.len(), records.len() - 1);
        assert_eq!(report.deleted, vec!["a.log", "c.log"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, temp_dir.path().join("gone.log"));
    }

    #[test]
    fn test_clean_reports_progress_per_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let records = records_for(&temp_dir, &["a.log", "b.log", "c.log"]);
        let recorder = Recorder::default();

        Cleaner::clean(&records, &recorder);

        let updates = recorder.updates.borrow();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].items_done, 3);
        assert_eq!(updates[2].total_items, Some(3));
        assert_eq!(updates[2].bytes_done, 21);
        assert!(*recorder.finished.borrow());
    }
}
