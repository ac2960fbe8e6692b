//! Removal of empty folders left behind in the watched directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Result of an empty-folder sweep.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Folders that were removed.
    pub removed: Vec<PathBuf>,
    /// Folders that looked empty but could not be removed.
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// A one-line, user-facing description of the sweep.
    pub fn describe(&self) -> String {
        match self.removed.len() {
            0 => "No empty folders were found.".to_string(),
            1 => "Deleted 1 empty folder.".to_string(),
            n => format!("Deleted {} empty folders.", n),
        }
    }
}

/// Removes every immediate subdirectory of `directory` that has no entries.
///
/// Nested folders are not descended into. A folder that fails to delete,
/// for example because something was written into it meanwhile, is recorded
/// in [`CleanupReport::failed`] and the sweep continues.
///
/// # Errors
///
/// Returns an error only if `directory` itself cannot be listed.
pub fn clean_empty_folders(directory: &Path) -> io::Result<CleanupReport> {
    let mut report = CleanupReport::default();

    for entry in fs::read_dir(directory)?.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let path = entry.path();
        let is_empty = match fs::read_dir(&path) {
            Ok(mut children) => children.next().is_none(),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot list folder");
                false
            }
        };
        if !is_empty {
            continue;
        }

        match fs::remove_dir(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed empty folder");
                report.removed.push(path);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove empty folder");
                report.failed.push((path, e.to_string()));
            }
        }
    }

    report.removed.sort();
    Ok(report)
}
