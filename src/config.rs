//! Persistent settings.
//!
//! Settings live in a TOML file that is read once at startup and rewritten
//! whenever something had to be repaired or the user changed a value.
//!
//! # Configuration File Format
//!
//! ```toml
//! downloads_path = "/home/me/Downloads"
//! archive_path = "/home/me/Documents/Archive"
//! min_size_mb = 50.0
//! max_age_days = 30
//! exclude_extensions = ["zip", "mp4", "exe"]
//! exclude_folders = ["node_modules", ".git", "venv"]
//! archive_extensions = ["pdf", "docx", "xlsx"]
//! ```
//!
//! Loading never fails on bad content. A missing file is created with the
//! defaults, missing keys are back-filled, and a malformed document is
//! replaced by the defaults. Every such repair is reported as a
//! [`ConfigWarning`] and written back to disk. Only a failed write is fatal.

use crate::archiver::DEFAULT_ARCHIVE_EXTENSIONS;
use crate::filter::{FilterCriteria, normalize_extension};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = "dropclear.toml";

/// Errors that stop configuration handling.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The configuration file could not be written.
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The configuration could not be serialized.
    SerializeFailed(String),
    /// A value given to an update was rejected.
    InvalidValue {
        /// The setting that was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadFailed { path, source } => {
                write!(f, "Cannot read configuration {}: {}", path.display(), source)
            }
            ConfigError::WriteFailed { path, source } => {
                write!(
                    f,
                    "Cannot write configuration {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeFailed(msg) => {
                write!(f, "Cannot serialize configuration: {}", msg)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A problem found while loading that was repaired automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// No configuration file existed; one was written with the defaults.
    Created(PathBuf),
    /// These keys were missing and took their default values.
    MissingKeys(Vec<&'static str>),
    /// The document could not be parsed; the defaults replaced it.
    Malformed(String),
    /// A value in the file was out of range and took its default.
    InvalidValue { field: &'static str, reason: String },
    /// The configured downloads folder doesn't exist.
    DownloadsPathFallback { configured: PathBuf, fallback: PathBuf },
    /// The configured archive folder didn't exist and was created.
    ArchivePathCreated(PathBuf),
    /// The configured archive folder could not be created.
    ArchivePathFallback {
        configured: PathBuf,
        fallback: PathBuf,
        reason: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::Created(path) => {
                write!(f, "Config file not found. Created {}", path.display())
            }
            ConfigWarning::MissingKeys(keys) => {
                write!(f, "Missing {} in config file. Using defaults.", keys.join(", "))
            }
            ConfigWarning::Malformed(reason) => {
                write!(f, "Invalid config file ({}). Using defaults.", reason)
            }
            ConfigWarning::InvalidValue { field, reason } => {
                write!(f, "Invalid {} in config file ({}). Using default.", field, reason)
            }
            ConfigWarning::DownloadsPathFallback {
                configured,
                fallback,
            } => write!(
                f,
                "Downloads path '{}' not found. Using default: '{}'",
                configured.display(),
                fallback.display()
            ),
            ConfigWarning::ArchivePathCreated(path) => {
                write!(f, "Created archive directory: {}", path.display())
            }
            ConfigWarning::ArchivePathFallback {
                configured,
                fallback,
                reason,
            } => write!(
                f,
                "Could not create archive path '{}' ({}). Using default: '{}'",
                configured.display(),
                reason,
                fallback.display()
            ),
        }
    }
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Folder that scan and clean operate on.
    pub downloads_path: PathBuf,
    /// Folder that archived files are moved into.
    pub archive_path: PathBuf,
    /// Default minimum size for cleaning, in MB.
    pub min_size_mb: f64,
    /// Default minimum age for cleaning, in days.
    pub max_age_days: u64,
    pub exclude_extensions: Vec<String>,
    pub exclude_folders: Vec<String>,
    /// Extensions archived when none are given.
    pub archive_extensions: Vec<String>,
}

impl Default for Config {
    /// Defaults based on the current user's platform folders.
    fn default() -> Self {
        Self {
            downloads_path: default_downloads_path(),
            archive_path: default_archive_path(),
            min_size_mb: 50.0,
            max_age_days: 30,
            exclude_extensions: strings(&["zip", "mp4", "exe"]),
            exclude_folders: strings(&["node_modules", ".git", "venv"]),
            archive_extensions: strings(&DEFAULT_ARCHIVE_EXTENSIONS),
        }
    }
}

impl Config {
    /// Filter criteria matching the configured clean defaults.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            min_age: self.max_age_days,
            min_size: self.min_size_mb,
            excluded_extensions: self.exclude_extensions.iter().cloned().collect(),
            excluded_folders: self.exclude_folders.iter().cloned().collect(),
            ..FilterCriteria::default()
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The user's Downloads folder, or `~/Downloads`.
pub fn default_downloads_path() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

/// `Archive` inside the user's Documents folder.
pub fn default_archive_path() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .unwrap_or_else(|| PathBuf::from("Documents"))
        .join("Archive")
}

/// Locates the configuration file.
///
/// Order of precedence:
/// 1. `explicit`, if provided
/// 2. `dropclear.toml` in the current directory, if it exists
/// 3. `dropclear/config.toml` in the platform config directory
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join("dropclear").join("config.toml"))
        .unwrap_or(local)
}

/// On-disk shape, with every key optional so gaps can be detected.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    downloads_path: Option<PathBuf>,
    archive_path: Option<PathBuf>,
    min_size_mb: Option<f64>,
    max_age_days: Option<u64>,
    exclude_extensions: Option<Vec<String>>,
    exclude_folders: Option<Vec<String>>,
    archive_extensions: Option<Vec<String>>,
}

impl RawConfig {
    /// Fills gaps from `defaults`, returning the names of filled keys.
    fn fill(self, defaults: &Config) -> (Config, Vec<&'static str>) {
        let mut missing = Vec::new();

        macro_rules! take {
            ($field:ident) => {
                self.$field.unwrap_or_else(|| {
                    missing.push(stringify!($field));
                    defaults.$field.clone()
                })
            };
        }

        let config = Config {
            downloads_path: take!(downloads_path),
            archive_path: take!(archive_path),
            min_size_mb: take!(min_size_mb),
            max_age_days: take!(max_age_days),
            exclude_extensions: take!(exclude_extensions),
            exclude_folders: take!(exclude_folders),
            archive_extensions: take!(archive_extensions),
        };
        (config, missing)
    }
}

/// Partial settings change. `None` leaves a value untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub downloads_path: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
    pub min_size_mb: Option<f64>,
    pub max_age_days: Option<u64>,
    pub exclude_extensions: Option<Vec<String>>,
    pub exclude_folders: Option<Vec<String>>,
    pub archive_extensions: Option<Vec<String>>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.downloads_path.is_none()
            && self.archive_path.is_none()
            && self.min_size_mb.is_none()
            && self.max_age_days.is_none()
            && self.exclude_extensions.is_none()
            && self.exclude_folders.is_none()
            && self.archive_extensions.is_none()
    }
}

/// Owner of the live settings and their file.
///
/// Reads take a snapshot under a read lock; the rare update holds the write
/// lock until the new settings are on disk.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    defaults: Config,
    config: RwLock<Config>,
    warnings: Vec<ConfigWarning>,
}

impl ConfigStore {
    /// Opens the store at `path` with platform defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::WriteFailed` if a repaired configuration
    /// cannot be saved, or `ConfigError::ReadFailed` if an existing file
    /// cannot be read at all.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        Self::open_with_defaults(path, Config::default())
    }

    /// Opens the store at `path`, repairing it from `defaults` as needed.
    pub fn open_with_defaults(path: &Path, defaults: Config) -> Result<Self, ConfigError> {
        let mut warnings = Vec::new();
        let (mut config, mut dirty) = Self::read(path, &defaults, &mut warnings)?;

        dirty |= validate_paths(&mut config, &defaults, &mut warnings);
        if dirty {
            save(path, &config)?;
        }

        for warning in &warnings {
            info!("{}", warning);
        }

        Ok(Self {
            path: path.to_path_buf(),
            defaults,
            config: RwLock::new(config),
            warnings,
        })
    }

    /// Loads the file, returning the settings and whether they need saving.
    fn read(
        path: &Path,
        defaults: &Config,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Config, bool), ConfigError> {
        if !path.exists() {
            warnings.push(ConfigWarning::Created(path.to_path_buf()));
            return Ok((defaults.clone(), true));
        }

        let bytes = fs::read(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                warnings.push(ConfigWarning::Malformed(e.to_string()));
                return Ok((defaults.clone(), true));
            }
        };

        match toml::from_str::<RawConfig>(&content) {
            Ok(raw) => {
                let (mut config, missing) = raw.fill(defaults);
                let mut dirty = !missing.is_empty();
                if dirty {
                    warnings.push(ConfigWarning::MissingKeys(missing));
                }
                if let Err(reason) = check_min_size(config.min_size_mb) {
                    warnings.push(ConfigWarning::InvalidValue {
                        field: "min_size_mb",
                        reason,
                    });
                    config.min_size_mb = defaults.min_size_mb;
                    dirty = true;
                }
                Ok((config, dirty))
            }
            Err(e) => {
                warnings.push(ConfigWarning::Malformed(e.message().to_string()));
                Ok((defaults.clone(), true))
            }
        }
    }

    /// Where the settings are stored.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Problems repaired while opening.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// A copy of the current settings.
    pub fn snapshot(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `update`, validates the result and writes it to disk.
    ///
    /// The downloads folder must exist; the archive folder is created if it
    /// doesn't. Nothing changes in memory if validation or saving fails.
    pub fn update(&self, update: ConfigUpdate) -> Result<Config, ConfigError> {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();

        if let Some(path) = update.downloads_path {
            if !path.is_dir() {
                return Err(ConfigError::InvalidValue {
                    field: "downloads_path",
                    reason: format!("{} is not a directory", path.display()),
                });
            }
            next.downloads_path = path;
        }
        if let Some(path) = update.archive_path {
            fs::create_dir_all(&path).map_err(|e| ConfigError::InvalidValue {
                field: "archive_path",
                reason: e.to_string(),
            })?;
            next.archive_path = path;
        }
        if let Some(size) = update.min_size_mb {
            next.min_size_mb = check_min_size(size).map_err(|reason| ConfigError::InvalidValue {
                field: "min_size_mb",
                reason,
            })?;
        }
        if let Some(days) = update.max_age_days {
            next.max_age_days = days;
        }
        if let Some(extensions) = update.exclude_extensions {
            next.exclude_extensions = normalize_list(extensions, normalize_extension);
        }
        if let Some(folders) = update.exclude_folders {
            next.exclude_folders = normalize_list(folders, |s| s.trim().to_string());
        }
        if let Some(extensions) = update.archive_extensions {
            next.archive_extensions = normalize_list(extensions, normalize_extension);
        }

        save(&self.path, &next)?;
        *guard = next.clone();
        info!("Configuration saved to {}", self.path.display());
        Ok(next)
    }

    /// The defaults this store falls back to.
    pub fn defaults(&self) -> &Config {
        &self.defaults
    }
}

/// Accepts a size threshold only if it is a finite, non-negative number.
pub fn check_min_size(size: f64) -> Result<f64, String> {
    if size.is_finite() && size >= 0.0 {
        Ok(size)
    } else {
        Err(format!("{} is not a non-negative number", size))
    }
}

fn normalize_list(items: Vec<String>, normalize: impl Fn(&str) -> String) -> Vec<String> {
    items
        .iter()
        .map(|item| normalize(item))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Swaps missing folders for defaults. Returns true if anything changed.
fn validate_paths(
    config: &mut Config,
    defaults: &Config,
    warnings: &mut Vec<ConfigWarning>,
) -> bool {
    let mut changed = false;

    if !config.downloads_path.exists() && config.downloads_path != defaults.downloads_path {
        warnings.push(ConfigWarning::DownloadsPathFallback {
            configured: config.downloads_path.clone(),
            fallback: defaults.downloads_path.clone(),
        });
        config.downloads_path = defaults.downloads_path.clone();
        changed = true;
    }

    if !config.archive_path.exists() {
        match fs::create_dir_all(&config.archive_path) {
            Ok(()) => {
                warnings.push(ConfigWarning::ArchivePathCreated(config.archive_path.clone()));
            }
            Err(e) if config.archive_path != defaults.archive_path => {
                warnings.push(ConfigWarning::ArchivePathFallback {
                    configured: config.archive_path.clone(),
                    fallback: defaults.archive_path.clone(),
                    reason: e.to_string(),
                });
                config.archive_path = defaults.archive_path.clone();
                changed = true;
            }
            Err(_) => {}
        }
    }

    changed
}

fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeFailed(e.to_string()))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, content).map_err(|source| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
