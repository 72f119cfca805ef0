//! dropclear - A downloads folder cleanup utility
//!
//! This library scans a directory tree, selects files by age, size, extension,
//! folder and fuzzy name match, and then deletes them or moves them into a
//! mirrored archive tree. Per-file failures never abort a batch.
//!
//! The pipeline is walker → record extraction → filter → cleaner or archiver,
//! exposed as four operations on [`Sweeper`].

pub mod archiver;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod filter;
pub mod fuzzy;
pub mod logging;
pub mod output;
pub mod progress;
pub mod record;
pub mod sweeper;
pub mod walker;

pub use archiver::{ArchiveReport, Archiver, ConflictPolicy};
pub use cleaner::{CleanReport, Cleaner};
pub use config::{Config, ConfigError, ConfigStore, ConfigUpdate, ConfigWarning};
pub use filter::{FilterCriteria, filter};
pub use progress::{NoProgress, Progress, ProgressObserver};
pub use record::FileRecord;
pub use sweeper::{ScanReport, Sweeper};

pub use cli::{Cli, run_cli};
