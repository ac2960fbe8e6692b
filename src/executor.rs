//! Executes a move plan against the filesystem.
//!
//! Entries are processed strictly in order, one at a time. A failing entry is
//! recorded and the run continues with the next one. Cancellation is checked
//! between entries: the file being moved when the signal arrives finishes (or
//! fails) first, then the run stops and nothing already moved is undone.

use crate::cleanup::{CleanupReport, clean_empty_folders};
use crate::manifest::{FailedEntry, ManifestEntry};
use crate::output::{NoopProgress, ProgressReporter};
use crate::queue::{MoveEntry, MovePlan};
use crate::rename::Renamer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Shared flag used to ask a running executor to stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Errors that can occur while moving a single file.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Failed to create the destination directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Something already exists at the target path.
    #[error("Refusing to overwrite existing {}", .path.display())]
    DestinationExists { path: PathBuf },
    /// Failed to move (or copy) the file.
    #[error("Failed to move {} to {}: {error}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// What happened to the entry that was in flight when the run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptedState {
    /// The move finished before the run stopped.
    Placed,
    /// The move failed; the source was left where it was.
    Failed,
    /// A leftover partial copy was found next to the destination and removed.
    PartialRemoved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptedEntry {
    pub file_name: String,
    pub destination: PathBuf,
    pub state: InterruptedState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every entry was attempted.
    Completed,
    /// The run was stopped early.
    Cancelled { interrupted: Option<InterruptedEntry> },
}

/// Everything the executor did.
#[derive(Debug)]
pub struct ExecutionReport {
    pub moved: Vec<ManifestEntry>,
    pub failed: Vec<FailedEntry>,
    pub outcome: Outcome,
    /// Set when the cleanup epilogue ran.
    pub cleanup: Option<CleanupReport>,
    /// Number of entries in the plan.
    pub planned: usize,
}

impl ExecutionReport {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, Outcome::Cancelled { .. })
    }

    /// Entries attempted, successfully or not.
    pub fn attempted(&self) -> usize {
        self.moved.len() + self.failed.len()
    }
}

/// Moves planned files into their destinations.
pub struct MoveExecutor {
    cancel: CancellationToken,
    renamer: Option<Renamer>,
    progress: Box<dyn ProgressReporter>,
    cleanup_dir: Option<PathBuf>,
}

impl MoveExecutor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            renamer: None,
            progress: Box::new(NoopProgress),
            cleanup_dir: None,
        }
    }

    /// Rename files on the way using `renamer`.
    pub fn with_renamer(mut self, renamer: Renamer) -> Self {
        self.renamer = Some(renamer);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Remove empty folders in `dir` after a run that was not cancelled.
    pub fn with_cleanup(mut self, dir: PathBuf) -> Self {
        self.cleanup_dir = Some(dir);
        self
    }

    /// Executes `plan` in order and reports what happened.
    pub fn execute(&mut self, plan: &MovePlan) -> ExecutionReport {
        let mut report = ExecutionReport {
            moved: Vec::new(),
            failed: Vec::new(),
            outcome: Outcome::Completed,
            cleanup: None,
            planned: plan.len(),
        };
        self.progress.start(plan.total_bytes, plan.len());

        let mut in_flight: Option<(&MoveEntry, PathBuf, bool)> = None;
        for entry in plan.entries() {
            if self.cancel.is_cancelled() {
                break;
            }

            let result = self.prepare_target(entry).and_then(|target| {
                move_file(&entry.source, &target)?;
                Ok(target)
            });

            match result {
                Ok(target) => {
                    tracing::info!(
                        file = %entry.file_name,
                        destination = %target.display(),
                        "moved file"
                    );
                    report.moved.push(ManifestEntry {
                        file_name: entry.file_name.clone(),
                        source: entry.source.clone(),
                        destination: target.clone(),
                    });
                    in_flight = Some((entry, target, true));
                }
                Err(e) => {
                    tracing::warn!(file = %entry.file_name, error = %e, "move failed");
                    report.failed.push(FailedEntry {
                        file_name: entry.file_name.clone(),
                        source: entry.source.clone(),
                        destination_dir: entry.destination_dir.clone(),
                        reason: e.to_string(),
                    });
                    let target = entry.default_target();
                    in_flight = Some((entry, target, false));
                }
            }
            self.progress.advance(entry.file_size, &entry.file_name);
        }

        if self.cancel.is_cancelled() {
            let interrupted = in_flight
                .map(|(entry, target, moved)| inspect_interrupted(entry, &target, moved));
            tracing::warn!(
                completed = report.moved.len(),
                planned = report.planned,
                "run cancelled"
            );
            self.progress.finish("> Cancelled");
            report.outcome = Outcome::Cancelled { interrupted };
            return report;
        }

        self.progress.finish("> All files have been moved");

        if let Some(dir) = &self.cleanup_dir {
            match clean_empty_folders(dir) {
                Ok(cleanup) => report.cleanup = Some(cleanup),
                Err(e) => tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "empty-folder cleanup failed"
                ),
            }
        }
        report
    }

    /// Creates the destination directory if needed and picks the final path.
    ///
    /// Only the last path segment is created; a missing parent is an error.
    fn prepare_target(&self, entry: &MoveEntry) -> Result<PathBuf, MoveError> {
        let dir = &entry.destination_dir;
        if !dir.is_dir() {
            fs::create_dir(dir).map_err(|e| MoveError::DirectoryCreationFailed {
                path: dir.clone(),
                source: e,
            })?;
        }

        let target = match &self.renamer {
            Some(renamer) => renamer.rename(dir, &entry.source),
            None => entry.default_target(),
        };
        Ok(target)
    }
}

/// Moves `source` to `target` without ever overwriting an existing file.
///
/// Uses a rename when both paths are on the same filesystem. Across
/// filesystems the file is copied to a hidden partial file next to `target`,
/// renamed into place, and only then is `source` removed.
pub fn move_file(source: &Path, target: &Path) -> Result<(), MoveError> {
    if target.exists() {
        return Err(MoveError::DestinationExists {
            path: target.to_path_buf(),
        });
    }

    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                source = %source.display(),
                "rename crosses filesystems, falling back to copy"
            );
            copy_then_remove(source, target)
        }
        Err(e) => Err(MoveError::FileMoveFailure {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
            error: e,
        }),
    }
}

/// The hidden file a cross-filesystem copy writes to before it is complete.
pub fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.dirsweep-partial", name))
}

fn copy_then_remove(source: &Path, target: &Path) -> Result<(), MoveError> {
    let failure = |error: io::Error| MoveError::FileMoveFailure {
        from: source.to_path_buf(),
        to: target.to_path_buf(),
        error,
    };
    let partial = partial_path(target);

    if let Err(e) = fs::copy(source, &partial).and_then(|_| fs::rename(&partial, target)) {
        let _ = fs::remove_file(&partial);
        return Err(failure(e));
    }

    if let Err(e) = fs::remove_file(source) {
        // Keep exactly one copy: the original.
        let _ = fs::remove_file(target);
        return Err(failure(e));
    }
    Ok(())
}

fn inspect_interrupted(entry: &MoveEntry, target: &Path, moved: bool) -> InterruptedEntry {
    let partial = partial_path(target);
    let state = if partial.exists() {
        match fs::remove_file(&partial) {
            Ok(()) => tracing::info!(path = %partial.display(), "removed partial copy"),
            Err(e) => tracing::warn!(
                path = %partial.display(),
                error = %e,
                "could not remove partial copy"
            ),
        }
        InterruptedState::PartialRemoved
    } else if moved && target.exists() {
        InterruptedState::Placed
    } else {
        InterruptedState::Failed
    };

    InterruptedEntry {
        file_name: entry.file_name.clone(),
        destination: target.to_path_buf(),
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RenameRule;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn entry(watched: &Path, name: &str, size: usize, dest: &Path) -> MoveEntry {
        let source = watched.join(name);
        fs::write(&source, vec![b'x'; size]).expect("Failed to write test file");
        MoveEntry {
            file_name: name.to_string(),
            file_size: size as u64,
            source,
            destination_dir: dest.to_path_buf(),
        }
    }

    /// Cancels the token once a given number of files have been reported.
    struct CancelAfter {
        token: CancellationToken,
        after: usize,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl ProgressReporter for CancelAfter {
        fn start(&mut self, _total_bytes: u64, _total_files: usize) {}
        fn advance(&mut self, _bytes: u64, file_name: &str) {
            self.seen.borrow_mut().push(file_name.to_string());
            if self.seen.borrow().len() == self.after {
                self.token.cancel();
            }
        }
        fn finish(&mut self, _message: &str) {}
    }

    #[test]
    fn test_moves_all_entries_and_creates_leaf_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path();
        let dest = watched.join("Docs");

        let plan = MovePlan::from_entries(vec![
            entry(watched, "a.txt", 5, &dest),
            entry(watched, "b.txt", 3, &dest),
        ]);
        let report = MoveExecutor::new(CancellationToken::new()).execute(&plan);

        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.moved.len(), 2);
        assert!(report.failed.is_empty());
        assert!(dest.join("a.txt").exists());
        assert!(dest.join("b.txt").exists());
        assert!(!watched.join("a.txt").exists());
        // Smallest first
        assert_eq!(report.moved[0].file_name, "b.txt");
    }

    #[test]
    fn test_missing_parent_fails_entry_but_run_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path();
        let bad_dest = watched.join("missing").join("Leaf");
        let good_dest = watched.join("Good");

        let plan = MovePlan::from_entries(vec![
            entry(watched, "first.txt", 1, &bad_dest),
            entry(watched, "second.txt", 2, &good_dest),
        ]);
        let report = MoveExecutor::new(CancellationToken::new()).execute(&plan);

        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file_name, "first.txt");
        assert!(report.failed[0].reason.contains("Failed to create directory"));
        assert!(watched.join("first.txt").exists());
        assert!(good_dest.join("second.txt").exists());
        assert_eq!(report.attempted(), 2);
    }

    #[test]
    fn test_never_overwrites_existing_target() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path();
        let dest = watched.join("Dest");
        fs::create_dir(&dest).unwrap();

        let plan = MovePlan::from_entries(vec![entry(watched, "same.txt", 4, &dest)]);
        fs::write(dest.join("same.txt"), "original").unwrap();

        let report = MoveExecutor::new(CancellationToken::new()).execute(&plan);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(fs::read_to_string(dest.join("same.txt")).unwrap(), "original");
        assert!(watched.join("same.txt").exists());
    }

    #[test]
    fn test_rename_applied_when_enabled() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path();
        let dest = watched.join("Shows");

        let plan = MovePlan::from_entries(vec![entry(watched, "my_show.mkv", 4, &dest)]);
        let renamer = Renamer::new(&[RenameRule {
            pattern: "_".to_string(),
            replacement: " ".to_string(),
        }]);
        let report = MoveExecutor::new(CancellationToken::new())
            .with_renamer(renamer)
            .execute(&plan);

        assert!(dest.join("my show.mkv").exists());
        assert_eq!(report.moved[0].destination, dest.join("my show.mkv"));
        assert_eq!(report.moved[0].file_name, "my_show.mkv");
    }

    #[test]
    fn test_cancellation_stops_between_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path();
        let dest = watched.join("Out");
        fs::create_dir(watched.join("empty")).unwrap();

        let plan = MovePlan::from_entries(vec![
            entry(watched, "one.txt", 1, &dest),
            entry(watched, "two.txt", 2, &dest),
            entry(watched, "three.txt", 3, &dest),
        ]);

        let token = CancellationToken::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let progress = CancelAfter {
            token: token.clone(),
            after: 1,
            seen: Rc::clone(&seen),
        };
        let report = MoveExecutor::new(token)
            .with_progress(Box::new(progress))
            .with_cleanup(watched.to_path_buf())
            .execute(&plan);

        assert!(report.is_cancelled());
        assert_eq!(report.moved.len(), 1);
        assert_eq!(report.planned, 3);
        assert!(dest.join("one.txt").exists());
        assert!(watched.join("two.txt").exists());
        assert!(watched.join("three.txt").exists());
        assert_eq!(
            report.outcome,
            Outcome::Cancelled {
                interrupted: Some(InterruptedEntry {
                    file_name: "one.txt".to_string(),
                    destination: dest.join("one.txt"),
                    state: InterruptedState::Placed,
                })
            }
        );
        // No cleanup after cancellation
        assert!(report.cleanup.is_none());
        assert!(watched.join("empty").exists());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_partial_copy_removed_on_cancellation() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path();
        let dest = watched.join("Out");
        fs::create_dir(&dest).unwrap();

        let planned = entry(watched, "big.iso", 8, &dest);
        let target = dest.join("big.iso");
        fs::write(partial_path(&target), "trunc").unwrap();

        let interrupted = inspect_interrupted(&planned, &target, false);
        assert_eq!(interrupted.state, InterruptedState::PartialRemoved);
        assert!(!partial_path(&target).exists());
        assert!(watched.join("big.iso").exists());
    }

    #[test]
    fn test_cleanup_epilogue_runs_after_completion() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path();
        fs::create_dir(watched.join("stale")).unwrap();
        let dest = watched.join("Out");

        let plan = MovePlan::from_entries(vec![entry(watched, "a.txt", 1, &dest)]);
        let report = MoveExecutor::new(CancellationToken::new())
            .with_cleanup(watched.to_path_buf())
            .execute(&plan);

        let cleanup = report.cleanup.expect("cleanup should have run");
        assert_eq!(cleanup.removed, vec![watched.join("stale")]);
        assert!(dest.join("a.txt").exists());
    }

    #[test]
    fn test_copy_then_remove_leaves_single_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("src.bin");
        let target = temp_dir.path().join("dst.bin");
        fs::write(&source, "payload").unwrap();

        copy_then_remove(&source, &target).expect("copy fallback failed");

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "payload");
        assert!(!partial_path(&target).exists());
    }

    #[test]
    fn test_copy_failure_leaves_no_partial() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("gone.bin");
        let target = temp_dir.path().join("dst.bin");

        let result = copy_then_remove(&source, &target);

        assert!(matches!(result, Err(MoveError::FileMoveFailure { .. })));
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_moved_unchanged() {
        use crate::prompt::AssumeAnswer;
        use crate::queue::QueueBuilder;
        use crate::rules::{Destination, FileTypeGroup, RuleSet};
        use std::collections::HashSet;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path().join("watch");
        fs::create_dir(&watched).unwrap();
        let dest = temp_dir.path().join("Text");
        let raw = OsStr::from_bytes(b"caf\xe9.txt");
        fs::write(watched.join(raw), "bytes").unwrap();

        let rules = RuleSet {
            groups: vec![FileTypeGroup {
                name: "text".to_string(),
                extensions: HashSet::from([".txt".to_string()]),
                destination: Destination::Path(dest.clone()),
            }],
            ..Default::default()
        };
        let plan = QueueBuilder::new(&rules)
            .build(&watched, &mut AssumeAnswer::NO)
            .unwrap();
        let report = MoveExecutor::new(CancellationToken::new()).execute(&plan);

        assert_eq!(report.moved.len(), 1);
        assert_eq!(report.moved[0].destination, dest.join(raw));
        assert!(dest.join(raw).exists());
        assert!(!watched.join(raw).exists());

        // A second scan sees the placed file and leaves nothing to do
        fs::write(watched.join(raw), "again").unwrap();
        let again = QueueBuilder::new(&rules)
            .build(&watched, &mut AssumeAnswer::NO)
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(fs::read_to_string(dest.join(raw)).unwrap(), "bytes");
    }
}
