//! Filename substitution applied while moving files.

use crate::rules::RenameRule;
use regex::{NoExpand, Regex, RegexBuilder};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Applies ordered, case-insensitive literal substitutions to filenames.
#[derive(Debug, Clone)]
pub struct Renamer {
    rules: Vec<(Regex, String)>,
}

impl Renamer {
    /// Compiles the rename rules. Patterns are literal text, so special regex
    /// characters in them carry no meaning.
    pub fn new(rules: &[RenameRule]) -> Self {
        let rules = rules
            .iter()
            .filter(|rule| !rule.pattern.is_empty())
            .filter_map(|rule| {
                RegexBuilder::new(&regex::escape(&rule.pattern))
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (re, rule.replacement.clone()))
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the path `source` should be moved to inside `destination_dir`.
    ///
    /// Rules are applied one after another to the file name. If after any
    /// step the name is empty, starts with `.`, or already exists in
    /// `destination_dir`, renaming is abandoned and the file keeps its
    /// original name.
    pub fn rename(&self, destination_dir: &Path, source: &Path) -> PathBuf {
        let original = source.file_name().unwrap_or_else(|| OsStr::new(""));
        let keep_original = || destination_dir.join(original);

        let Some(mut name) = original.to_str().map(str::to_string) else {
            return keep_original();
        };

        for (pattern, replacement) in &self.rules {
            name = pattern.replace_all(&name, NoExpand(replacement.as_str())).into_owned();

            if name.is_empty() || name.starts_with('.') || destination_dir.join(&name).exists() {
                tracing::debug!(
                    file = %original.to_string_lossy(),
                    candidate = %name,
                    "rename abandoned; keeping original name"
                );
                return keep_original();
            }
        }

        destination_dir.join(name)
    }
}
