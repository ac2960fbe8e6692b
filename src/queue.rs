//! Scans the watched folder and builds the move plan.

use crate::classifier::{SkipReason, Verdict, classify};
use crate::executor::CancellationToken;
use crate::prompt::Confirm;
use crate::rules::RuleSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Files above this size are reported as large transfers.
pub const LARGE_FILE_THRESHOLD: u64 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Error reading directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One planned move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEntry {
    /// Display form of the name; not valid UTF-8 bytes are replaced.
    pub file_name: String,
    pub file_size: u64,
    pub source: PathBuf,
    pub destination_dir: PathBuf,
}

impl MoveEntry {
    /// The name exactly as it appears on disk.
    pub fn os_name(&self) -> &OsStr {
        self.source
            .file_name()
            .unwrap_or_else(|| OsStr::new(&self.file_name))
    }

    /// Where the file lands when it keeps its name.
    pub fn default_target(&self) -> PathBuf {
        self.destination_dir.join(self.os_name())
    }
}

/// Planned moves ordered by ascending size, with aggregate totals.
#[derive(Debug, Clone, Default)]
pub struct MovePlan {
    entries: Vec<MoveEntry>,
    pub total_bytes: u64,
    /// Entries above [`LARGE_FILE_THRESHOLD`].
    pub large_files: usize,
    /// Files deleted on request while scanning.
    pub deleted: Vec<PathBuf>,
    /// Files left in place and why.
    pub skipped: Vec<(String, SkipReason)>,
}

impl MovePlan {
    /// Builds a plan from arbitrary entries, sorting them and computing totals.
    pub fn from_entries(mut entries: Vec<MoveEntry>) -> Self {
        entries.sort_by_key(|e| e.file_size);
        let total_bytes = entries.iter().map(|e| e.file_size).sum();
        let large_files = entries
            .iter()
            .filter(|e| e.file_size > LARGE_FILE_THRESHOLD)
            .count();
        Self {
            entries,
            total_bytes,
            large_files,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[MoveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a [`MovePlan`] for a watched folder.
pub struct QueueBuilder<'a> {
    rules: &'a RuleSet,
    ask_to_delete: bool,
    cancel: Option<CancellationToken>,
}

impl<'a> QueueBuilder<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            ask_to_delete: false,
            cancel: None,
        }
    }

    /// Offer deletion of files whose extension is a delete candidate.
    pub fn ask_to_delete(mut self, enabled: bool) -> Self {
        self.ask_to_delete = enabled;
        self
    }

    /// Stop offering deletions once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn offers_deletion(&self) -> bool {
        self.ask_to_delete && !self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Scans the immediate children of `watched_dir`.
    ///
    /// Only regular files whose names do not start with `.` are considered.
    /// Delete candidates are offered to `confirm` first when deletion is
    /// enabled; confirmed files are removed and left out of the plan. Every
    /// other file is classified and, if it has a destination, planned. After
    /// cancellation no further deletions are offered.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::ReadDir` if the folder cannot be listed. Problems
    /// with individual entries are logged and the entry is left alone.
    pub fn build(
        &self,
        watched_dir: &Path,
        confirm: &mut dyn Confirm,
    ) -> Result<MovePlan, QueueError> {
        let entries = fs::read_dir(watched_dir).map_err(|e| QueueError::ReadDir {
            path: watched_dir.to_path_buf(),
            source: e,
        })?;

        let mut planned = Vec::new();
        let mut deleted = Vec::new();
        let mut skipped = Vec::new();

        for entry in entries.flatten() {
            let os_name = entry.file_name();
            let file_name = os_name.to_string_lossy().to_string();
            if file_name.starts_with('.') {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                tracing::warn!(file = %file_name, "could not read metadata; skipping");
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let path = entry.path();

            if self.offers_deletion()
                && self.rules.is_delete_candidate(&file_name)
                && confirm.confirm(&format!("Do you want to delete {}?", file_name))
            {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), "deleted file on request");
                        deleted.push(path);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "could not delete file");
                    }
                }
            }

            match classify(&os_name, self.rules) {
                Verdict::Destination(destination_dir) => planned.push(MoveEntry {
                    file_name,
                    file_size: metadata.len(),
                    source: path,
                    destination_dir,
                }),
                Verdict::Skip(reason) => {
                    tracing::debug!(file = %file_name, ?reason, "skipping file");
                    skipped.push((file_name, reason));
                }
            }
        }

        let mut plan = MovePlan::from_entries(planned);
        plan.deleted = deleted;
        plan.skipped = skipped;
        Ok(plan)
    }
}
