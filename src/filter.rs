//! Multi-criteria selection of scanned files.
//!
//! [`FilterCriteria`] is the plain value bundle callers fill in. Before use it
//! is compiled into [`CompiledCriteria`], which normalizes the exclusion sets
//! and the search pattern once, so that per-record checks are cheap lookups.
//!
//! A record is kept only if it passes every rule:
//! 1. Hidden files are dropped unless `include_hidden` is set
//! 2. Excluded extensions are dropped
//! 3. Records under an excluded folder name, at any depth, are dropped
//! 4. Records younger than `min_age` days or smaller than `min_size` MB are dropped
//! 5. With a non-empty pattern, records that don't fuzzy-match are dropped

use crate::fuzzy::{self, DEFAULT_THRESHOLD};
use crate::record::FileRecord;
use std::collections::HashSet;
use std::path::Component;

/// Selection rules for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    /// Minimum age in whole days (inclusive).
    pub min_age: u64,
    /// Minimum size in megabytes (inclusive).
    pub min_size: f64,
    /// Fuzzy search pattern; empty disables the search.
    pub name_pattern: String,
    /// Extensions to leave out, with or without a leading dot.
    pub excluded_extensions: HashSet<String>,
    /// Folder names to leave out wherever they occur in a path.
    pub excluded_folders: HashSet<String>,
    pub include_hidden: bool,
    /// Minimum fuzzy score, 0 to 100.
    pub fuzzy_threshold: u8,
}

impl Default for FilterCriteria {
    /// Criteria that accept every visible file.
    fn default() -> Self {
        Self {
            min_age: 0,
            min_size: 0.0,
            name_pattern: String::new(),
            excluded_extensions: HashSet::new(),
            excluded_folders: HashSet::new(),
            include_hidden: false,
            fuzzy_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl FilterCriteria {
    /// Normalizes the criteria for matching.
    pub fn compile(&self) -> CompiledCriteria {
        CompiledCriteria {
            min_age: self.min_age,
            min_size: self.min_size,
            pattern: self.name_pattern.trim().to_lowercase(),
            excluded_extensions: self
                .excluded_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .filter(|ext| !ext.is_empty())
                .collect(),
            excluded_folders: self.excluded_folders.clone(),
            include_hidden: self.include_hidden,
            fuzzy_threshold: self.fuzzy_threshold,
        }
    }
}

/// Lowercases an extension and strips any leading dots.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Criteria ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledCriteria {
    min_age: u64,
    min_size: f64,
    pattern: String,
    excluded_extensions: HashSet<String>,
    excluded_folders: HashSet<String>,
    include_hidden: bool,
    fuzzy_threshold: u8,
}

impl CompiledCriteria {
    /// Checks one record against every rule.
    pub fn admits(&self, record: &FileRecord) -> bool {
        if record.is_hidden && !self.include_hidden {
            return false;
        }

        if self.excluded_extensions.contains(&record.extension) {
            return false;
        }

        if self.in_excluded_folder(record) {
            return false;
        }

        if record.age_days < self.min_age || record.size_mb < self.min_size {
            return false;
        }

        self.matches_pattern(record)
    }

    fn in_excluded_folder(&self, record: &FileRecord) -> bool {
        if self.excluded_folders.is_empty() {
            return false;
        }
        record.relative_path.components().any(|component| match component {
            Component::Normal(segment) => self
                .excluded_folders
                .contains(&*segment.to_string_lossy()),
            _ => false,
        })
    }

    fn matches_pattern(&self, record: &FileRecord) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        fuzzy::matches(&record.name, &self.pattern, self.fuzzy_threshold)
            || fuzzy::matches(
                &record.relative_path.to_string_lossy(),
                &self.pattern,
                self.fuzzy_threshold,
            )
    }
}

/// Keeps the records that satisfy `criteria`, in their original order.
pub fn filter(records: Vec<FileRecord>, criteria: &FilterCriteria) -> Vec<FileRecord> {
    let compiled = criteria.compile();
    records
        .into_iter()
        .filter(|record| compiled.admits(record))
        .collect()
}
