/// Recursive enumeration of regular files.
///
/// Unreadable subtrees are skipped rather than failing the walk: the
/// filesystem is live, and a single locked folder must not hide the rest of
/// the tree.
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A subtree that could not be read during a walk.
#[derive(Debug)]
pub struct TraversalError {
    pub path: Option<PathBuf>,
    pub reason: String,
}

impl std::fmt::Display for TraversalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "Skipped {}: {}", path.display(), self.reason),
            None => write!(f, "Skipped unreadable entry: {}", self.reason),
        }
    }
}

impl std::error::Error for TraversalError {}

impl From<walkdir::Error> for TraversalError {
    fn from(err: walkdir::Error) -> Self {
        Self {
            path: err.path().map(Path::to_path_buf),
            reason: err
                .io_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| err.to_string()),
        }
    }
}

/// Lazy iterator over the regular files under a root.
///
/// Symlinks are not followed and not yielded. Order is whatever the
/// filesystem returns.
pub struct Walk {
    inner: walkdir::IntoIter,
    pruned: Option<PathBuf>,
    skipped: Vec<TraversalError>,
}

/// Starts a walk at `root`.
///
/// A missing or unreadable root simply produces no files.
pub fn walk(root: &Path) -> Walk {
    Walk {
        inner: WalkDir::new(root).follow_links(false).into_iter(),
        pruned: None,
        skipped: Vec::new(),
    }
}

impl Walk {
    /// Leaves out everything under `dir`.
    pub fn skipping(mut self, dir: &Path) -> Self {
        self.pruned = Some(dir.to_path_buf());
        self
    }

    /// Subtrees skipped so far.
    pub fn skipped(&self) -> &[TraversalError] {
        &self.skipped
    }

    /// Consumes the walk and hands back the skipped subtrees.
    pub fn into_skipped(self) -> Vec<TraversalError> {
        self.skipped
    }
}

impl Iterator for Walk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        if self
                            .pruned
                            .as_deref()
                            .is_some_and(|pruned| entry.path() == pruned)
                        {
                            self.inner.skip_current_dir();
                        }
                        continue;
                    }
                    if entry.file_type().is_file() {
                        return Some(entry.into_path());
                    }
                }
                Err(err) => {
                    let err = TraversalError::from(err);
                    debug!("{}", err);
                    self.skipped.push(err);
                }
            }
        }
    }
}
