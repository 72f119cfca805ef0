/// Archive system for moving documents out of the scan root.
///
/// The archiver does its own scan: it walks the source root, keeps the files
/// whose extension is on the allowlist, and moves each one to the same
/// relative location under the archive root, creating parent directories as
/// it goes. Generic filter criteria do not apply here.
use crate::filter::normalize_extension;
use crate::progress::{ProgressObserver, Tracker};
use crate::record::extension_of;
use crate::walker;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions archived when the caller doesn't name any.
pub const DEFAULT_ARCHIVE_EXTENSIONS: [&str; 3] = ["pdf", "docx", "xlsx"];

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Pick a free name such as `report (1).pdf`.
    #[default]
    Rename,
    /// Leave the source where it is.
    Skip,
    /// Replace the existing destination file.
    Overwrite,
}

/// Errors raised while archiving.
#[derive(Debug)]
pub enum ArchiveError {
    /// The source root is missing or not a directory.
    InvalidSourceRoot { path: PathBuf },
    /// The archive root could not be created.
    TargetCreationFailed { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSourceRoot { path } => {
                write!(f, "Source directory {} does not exist", path.display())
            }
            Self::TargetCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create archive directory {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ArchiveError {}

/// A file that could not be archived.
#[derive(Debug)]
pub struct MoveError {
    pub source_path: PathBuf,
    pub destination: PathBuf,
    pub source: io::Error,
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to move {} to {}: {}",
            self.source_path.display(),
            self.destination.display(),
            self.source
        )
    }
}

impl std::error::Error for MoveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// One archived file.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedFile {
    /// Location relative to the source root, before the move.
    pub relative_path: PathBuf,
    /// Where the file ended up.
    pub destination: PathBuf,
}

/// Outcome of an archive pass.
#[derive(Debug, Default)]
pub struct ArchiveReport {
    pub moved: Vec<ArchivedFile>,
    /// Files left alone because the destination existed.
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<MoveError>,
    pub bytes_moved: u64,
}

impl ArchiveReport {
    /// Relative paths of the moved files.
    pub fn moved_paths(&self) -> Vec<&Path> {
        self.moved.iter().map(|f| f.relative_path.as_path()).collect()
    }
}

/// Moves documents from a source root into a mirrored archive tree.
#[derive(Debug, Clone)]
pub struct Archiver {
    source_root: PathBuf,
    target_root: PathBuf,
    conflict: ConflictPolicy,
}

impl Archiver {
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
            conflict: ConflictPolicy::default(),
        }
    }

    pub fn with_conflict_policy(mut self, conflict: ConflictPolicy) -> Self {
        self.conflict = conflict;
        self
    }

    /// Lists the files an archive pass would move, relative to the source root.
    pub fn plan(&self, extensions: &[String]) -> Result<Vec<PathBuf>, ArchiveError> {
        Ok(self
            .candidates(extensions)?
            .into_iter()
            .map(|path| self.relative(&path))
            .collect())
    }

    /// Rescans the source root and moves every allowlisted file.
    ///
    /// An empty `extensions` list falls back to
    /// [`DEFAULT_ARCHIVE_EXTENSIONS`]. The archive root is created if needed.
    /// Individual failures are recorded in the report and never stop the
    /// batch.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dropclear::archiver::Archiver;
    /// use dropclear::progress::NoProgress;
    ///
    /// let archiver = Archiver::new("/home/me/Downloads", "/home/me/Documents/Archive");
    /// let report = archiver.archive(&["pdf".to_string()], &NoProgress).unwrap();
    /// for path in report.moved_paths() {
    ///     println!("Archived {}", path.display());
    /// }
    /// ```
    pub fn archive(
        &self,
        extensions: &[String],
        observer: &dyn ProgressObserver,
    ) -> Result<ArchiveReport, ArchiveError> {
        let candidates = self.candidates(extensions)?;

        fs::create_dir_all(&self.target_root).map_err(|source| {
            ArchiveError::TargetCreationFailed {
                path: self.target_root.clone(),
                source,
            }
        })?;

        let mut report = ArchiveReport::default();
        let mut tracker = Tracker::new(observer, Some(candidates.len() as u64));

        for path in candidates {
            let relative_path = self.relative(&path);
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            match self.move_one(&path, &relative_path) {
                Ok(Some(destination)) => {
                    report.bytes_moved += size;
                    tracker.advance(size);
                    report.moved.push(ArchivedFile {
                        relative_path,
                        destination,
                    });
                }
                Ok(None) => {
                    debug!("Skipped {}: destination exists", relative_path.display());
                    report.skipped.push(relative_path);
                    tracker.advance(0);
                }
                Err(err) => {
                    debug!("{}", err);
                    report.failures.push(err);
                    tracker.advance(0);
                }
            }
        }
        tracker.finish();

        info!(
            moved = report.moved.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "archive finished"
        );
        Ok(report)
    }

    /// Walks the source root and keeps the allowlisted files.
    ///
    /// The archive root is pruned from the walk when it lives inside the
    /// source root, so already archived files are never picked up again.
    fn candidates(&self, extensions: &[String]) -> Result<Vec<PathBuf>, ArchiveError> {
        if !self.source_root.is_dir() {
            return Err(ArchiveError::InvalidSourceRoot {
                path: self.source_root.clone(),
            });
        }

        let allowlist = allowlist(extensions);
        Ok(walker::walk(&self.source_root)
            .skipping(&self.target_root)
            .filter(|path| allowlist.contains(&extension_of(path)))
            .collect())
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.source_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or(path.as_os_str())))
    }

    /// Moves one file, returning its destination or `None` when skipped.
    fn move_one(&self, path: &Path, relative_path: &Path) -> Result<Option<PathBuf>, MoveError> {
        let mut destination = self.target_root.join(relative_path);
        let fail = |destination: &Path, source: io::Error| MoveError {
            source_path: path.to_path_buf(),
            destination: destination.to_path_buf(),
            source,
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| fail(&destination, e))?;
        }

        if destination.exists() {
            match self.conflict {
                ConflictPolicy::Skip => return Ok(None),
                ConflictPolicy::Rename => destination = free_name(&destination),
                ConflictPolicy::Overwrite => {
                    fs::remove_file(&destination).map_err(|e| fail(&destination, e))?;
                }
            }
        }

        move_file(path, &destination).map_err(|e| fail(&destination, e))?;
        Ok(Some(destination))
    }
}

/// Normalized allowlist, falling back to the default extensions.
fn allowlist(extensions: &[String]) -> HashSet<String> {
    let set: HashSet<String> = extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| !ext.is_empty())
        .collect();
    if set.is_empty() {
        DEFAULT_ARCHIVE_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect()
    } else {
        set
    }
}

/// First `name (n).ext` next to `path` that doesn't exist yet.
fn free_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    (1..)
        .map(|n| parent.join(format!("{} ({}){}", stem, n, extension)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Renames `from` to `to`, copying across devices when a rename can't.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        Err(e) => Err(e),
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        // Keep a single copy of the data.
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}
