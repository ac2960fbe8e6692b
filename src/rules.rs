//! The compiled, immutable rule set for one run.
//!
//! A [`RuleSet`] is produced by [`CleanerConfig::compile`](crate::config::CleanerConfig::compile)
//! and is only ever read afterwards. Group and keyword rules keep the order in
//! which they appear in the configuration file, since later matches override
//! earlier ones during classification.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The literal used in configuration files to mark a destination as skipped.
pub const SKIP_LITERAL: &str = "skip";

/// Where files matching a rule should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Move matching files into this directory.
    Path(PathBuf),
    /// Leave matching files where they are.
    Skip,
}

impl Destination {
    /// Parses a configured destination value. Only the exact, lower-case
    /// `"skip"` literal means skip; any other spelling is a path.
    pub fn parse(value: &str, home: Option<&Path>) -> Self {
        if value == SKIP_LITERAL {
            Destination::Skip
        } else {
            Destination::Path(expand_home(value, home))
        }
    }

    /// Returns the directory path, or `None` for [`Destination::Skip`].
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Destination::Path(path) => Some(path),
            Destination::Skip => None,
        }
    }
}

/// A named set of extensions that share a default destination.
#[derive(Debug, Clone)]
pub struct FileTypeGroup {
    pub name: String,
    /// Lower-cased, dot-prefixed extensions.
    pub extensions: HashSet<String>,
    /// `Skip` when the configuration has no destination for this group.
    pub destination: Destination,
}

/// A filename keyword that overrides group and special-case destinations.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    /// Lower-cased keyword, matched as a substring of the lower-cased filename.
    pub keyword: String,
    /// Extensions (lower-cased, dot-prefixed) or group names. The first element
    /// doubles as a group-level wildcard.
    pub matches: Vec<String>,
    pub destination: Destination,
}

impl KeywordRule {
    /// Whether this rule applies to a file with `extension` matched by `group`.
    pub fn applies_to(&self, extension: &str, group: &str) -> bool {
        self.matches.iter().any(|m| m == extension)
            || self.matches.first().is_some_and(|first| first == group)
    }
}

/// A literal, case-insensitive substring substitution applied when renaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    pub pattern: String,
    pub replacement: String,
}

/// Immutable classification and behaviour rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub groups: Vec<FileTypeGroup>,
    /// Keyed by lower-cased, dot-prefixed extension.
    pub special_cases: HashMap<String, Destination>,
    pub keywords: Vec<KeywordRule>,
    /// Lower-cased, dot-prefixed extensions that may be deleted instead of moved.
    pub delete_extensions: HashSet<String>,
    pub rename_rules: Vec<RenameRule>,
}

impl RuleSet {
    /// Whether files with this name are candidates for delete-before-move.
    pub fn is_delete_candidate(&self, file_name: &str) -> bool {
        self.delete_extensions.contains(&extension_of(file_name))
    }

    /// Every configured destination whose parent directory does not exist.
    ///
    /// Destinations whose final segment is missing are not reported; that
    /// directory is created when the first file is moved into it. The result
    /// is deduplicated. Group and keyword destinations follow configuration
    /// order; special cases, which are keyed by extension, are sorted by
    /// extension and listed between the two.
    pub fn missing_destinations(&self) -> Vec<PathBuf> {
        let mut special: Vec<_> = self.special_cases.iter().collect();
        special.sort_by(|a, b| a.0.cmp(b.0));

        let candidates = self
            .groups
            .iter()
            .map(|g| &g.destination)
            .chain(special.into_iter().map(|(_, dest)| dest))
            .chain(self.keywords.iter().map(|k| &k.destination));

        let mut missing: Vec<PathBuf> = Vec::new();
        for dest in candidates.filter_map(Destination::as_path) {
            let parent_exists = match dest.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
                _ => true,
            };
            if !parent_exists && !missing.iter().any(|m| m == dest) {
                missing.push(dest.to_path_buf());
            }
        }
        missing
    }
}

/// Returns the dot-prefixed, lower-cased extension used for rule matching.
///
/// Only the text after the last `.` counts, so `wallpaper.png.zip` yields
/// `.zip`. A name without any `.` yields the whole name prefixed with `.`.
pub fn extension_of(file_name: &str) -> String {
    let tail = file_name.rsplit('.').next().unwrap_or(file_name);
    format!(".{}", tail.to_lowercase())
}

/// Normalises a configured extension to the form produced by [`extension_of`].
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Expands a leading `~` against the given home directory.
pub fn expand_home(value: &str, home: Option<&Path>) -> PathBuf {
    match (value.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => PathBuf::from(value),
    }
}

/// The current user's home directory, from `$HOME` (or `%USERPROFILE%`).
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
