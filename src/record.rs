/// File metadata snapshots.
///
/// A [`FileRecord`] is taken once per scan pass and never updated. Rescanning
/// produces a fresh set of records; nothing ties a record to its predecessor.
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes per megabyte, binary convention.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Everything the filter and actions need to know about one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    /// Absolute location on disk.
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    /// Location relative to the scan root.
    #[serde(serialize_with = "serialize_lossy")]
    pub relative_path: PathBuf,
    /// The file name, including extension.
    pub name: String,
    /// Lowercased extension without the leading dot, or empty.
    pub extension: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Whole days between `modified` and the moment the scan started.
    pub age_days: u64,
    /// Whether the name starts with a dot.
    pub is_hidden: bool,
}

impl FileRecord {
    /// The folder this record is grouped under, relative to the scan root.
    ///
    /// Files directly under the root belong to [`ROOT_GROUP`].
    pub fn folder(&self) -> String {
        folder_of(&self.relative_path)
    }
}

/// Writes a path as a string, replacing invalid UTF-8 with U+FFFD.
fn serialize_lossy<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Display folder of a path relative to the scan root.
pub fn folder_of(relative_path: &Path) -> String {
    match relative_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ROOT_GROUP.to_string(),
    }
}

/// Group name for files that sit directly in the scan root.
pub const ROOT_GROUP: &str = "Root";

/// Metadata for a file could not be read.
///
/// Usually the file disappeared between enumeration and stat. Callers skip
/// the file and carry on.
#[derive(Debug)]
pub struct StatError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for StatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cannot read metadata for {}: {}",
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for StatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Reads metadata for `path` and builds a record relative to `scan_root`.
///
/// `now` is the scan's reference instant so that every record of one pass
/// measures age against the same moment. A modification time in the future
/// yields an age of zero.
pub fn extract(path: &Path, scan_root: &Path, now: DateTime<Utc>) -> Result<FileRecord, StatError> {
    let metadata = fs::metadata(path).map_err(|source| StatError {
        path: path.to_path_buf(),
        source,
    })?;
    let modified: DateTime<Utc> = metadata
        .modified()
        .map_err(|source| StatError {
            path: path.to_path_buf(),
            source,
        })?
        .into();

    let relative_path = path
        .strip_prefix(scan_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf());

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let size_bytes = metadata.len();
    let age_days = (now - modified).num_days().max(0) as u64;

    Ok(FileRecord {
        path: path.to_path_buf(),
        relative_path,
        extension: extension_of(path),
        is_hidden: name.starts_with('.'),
        name,
        size_bytes,
        size_mb: size_bytes as f64 / BYTES_PER_MB,
        modified,
        age_days,
    })
}

/// Lowercased extension of `path` without the dot, or an empty string.
///
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use filetime::FileTime;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch_days_ago(path: &Path, days: i64, now: DateTime<Utc>) {
        let when = now - Duration::days(days);
        filetime::set_file_mtime(path, FileTime::from_unix_time(when.timestamp(), 0))
            .expect("Failed to set mtime");
    }

    #[test]
    fn test_extract_basic_fields() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("docs")).unwrap();
        let file_path = root.join("docs").join("Report.PDF");
        let file = File::create(&file_path).unwrap();
        file.set_len(3 * 1024 * 1024).unwrap();

        let now = Utc::now();
        touch_days_ago(&file_path, 10, now);

        let record = extract(&file_path, root, now).expect("extract failed");
        assert_eq!(record.name, "Report.PDF");
        assert_eq!(record.extension, "pdf");
        assert_eq!(record.relative_path, Path::new("docs").join("Report.PDF"));
        assert_eq!(record.size_bytes, 3 * 1024 * 1024);
        assert!((record.size_mb - 3.0).abs() < f64::EPSILON);
        assert_eq!(record.age_days, 10);
        assert!(!record.is_hidden);
        assert_eq!(record.folder(), "docs");
    }

    #[test]
    fn test_age_truncates_partial_days() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file_path = temp_dir.path().join("a.txt");
        fs::write(&file_path, "x").unwrap();

        let now = Utc::now();
        let when = now - Duration::hours(47);
        filetime::set_file_mtime(&file_path, FileTime::from_unix_time(when.timestamp(), 0))
            .unwrap();

        let record = extract(&file_path, temp_dir.path(), now).unwrap();
        assert_eq!(record.age_days, 1);
    }

    #[test]
    fn test_future_mtime_is_age_zero() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file_path = temp_dir.path().join("future.txt");
        fs::write(&file_path, "x").unwrap();

        let now = Utc::now();
        touch_days_ago(&file_path, -5, now);

        let record = extract(&file_path, temp_dir.path(), now).unwrap();
        assert_eq!(record.age_days, 0);
    }

    #[test]
    fn test_hidden_and_extensionless() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let hidden = temp_dir.path().join(".bashrc");
        let plain = temp_dir.path().join("Makefile");
        fs::write(&hidden, "").unwrap();
        fs::write(&plain, "").unwrap();

        let now = Utc::now();
        let hidden = extract(&hidden, temp_dir.path(), now).unwrap();
        let plain = extract(&plain, temp_dir.path(), now).unwrap();

        assert!(hidden.is_hidden);
        assert_eq!(hidden.extension, "");
        assert!(!plain.is_hidden);
        assert_eq!(plain.extension, "");
        assert_eq!(plain.folder(), ROOT_GROUP);
    }

    #[test]
    fn test_relative_path_falls_back_outside_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let other_dir = TempDir::new().expect("Failed to create temp directory");
        let file_path = other_dir.path().join("stray.txt");
        fs::write(&file_path, "x").unwrap();

        let record = extract(&file_path, temp_dir.path(), Utc::now()).unwrap();
        assert_eq!(record.relative_path, file_path);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_serializes_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file_path = temp_dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        if fs::write(&file_path, "x").is_err() {
            // Some filesystems refuse non-UTF-8 names.
            return;
        }

        let record = extract(&file_path, temp_dir.path(), Utc::now()).unwrap();
        let json = serde_json::to_value(&record).expect("serialization failed");

        assert_eq!(json["relative_path"], "caf\u{fffd}.txt");
        assert_eq!(json["name"], "caf\u{fffd}.txt");
        assert_eq!(json["extension"], "txt");
    }

    #[test]
    fn test_missing_file_is_stat_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("gone.txt");

        let err = extract(&missing, temp_dir.path(), Utc::now()).unwrap_err();
        assert_eq!(err.path, missing);
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }
}
