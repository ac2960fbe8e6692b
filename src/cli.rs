//! Run orchestration for dirsweep.
//!
//! A run goes through these steps:
//! 1. Load and compile the configuration
//! 2. Check that every destination's parent directory exists
//! 3. Scan the watched folder into a move plan (offering deletes)
//! 4. Execute the plan, then remove empty folders
//! 5. Signal completion and print the manifest

use crate::cleanup::{CleanupReport, clean_empty_folders};
use crate::config::{CleanerConfig, ConfigError};
use crate::executor::{
    CancellationToken, ExecutionReport, InterruptedState, MoveExecutor, Outcome,
};
use crate::manifest::Manifest;
use crate::output::{OutputFormatter, format_size, progress_reporter};
use crate::prompt::{CompletionNotifier, Confirm};
use crate::queue::{MovePlan, QueueBuilder, QueueError};
use crate::rename::Renamer;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Above this many moved files the user is asked before the manifest is shown.
pub const MANIFEST_PROMPT_THRESHOLD: usize = 5;

/// Fatal errors that stop a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Options for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit configuration file; the default location is used otherwise.
    pub config_path: Option<PathBuf>,
    /// Report what would happen without deleting or moving anything.
    pub dry_run: bool,
    /// Also write the manifest as JSON here.
    pub manifest_path: Option<PathBuf>,
}

/// The collaborators a run talks to.
pub struct Collaborators<'a> {
    pub confirm: &'a mut dyn Confirm,
    pub notifier: &'a dyn CompletionNotifier,
    pub cancel: CancellationToken,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunSummary {
    /// The user declined to continue after the destination check.
    Aborted { missing: Vec<PathBuf> },
    /// Cancelled before any file was moved; `deleted` lists files already
    /// removed on request.
    Cancelled { deleted: Vec<PathBuf> },
    /// Nothing needed moving.
    NothingToDo {
        deleted: Vec<PathBuf>,
        cleanup: Option<CleanupReport>,
    },
    /// A dry run; `plan` is what would have been executed.
    DryRun { plan: MovePlan },
    /// The plan was executed, fully or until cancelled.
    Finished {
        report: ExecutionReport,
        manifest: Manifest,
    },
}

/// Loads configuration as described by `options` and runs the pipeline.
///
/// # Examples
///
/// ```no_run
/// use dirsweep::cli::{Collaborators, RunOptions, run_cli};
/// use dirsweep::executor::CancellationToken;
/// use dirsweep::prompt::{AssumeAnswer, SilentNotifier};
///
/// let mut confirm = AssumeAnswer::YES;
/// let collaborators = Collaborators {
///     confirm: &mut confirm,
///     notifier: &SilentNotifier,
///     cancel: CancellationToken::new(),
/// };
/// match run_cli(&RunOptions::default(), collaborators) {
///     Ok(summary) => println!("{:?}", summary),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(
    options: &RunOptions,
    collaborators: Collaborators<'_>,
) -> Result<RunSummary, RunError> {
    let config = CleanerConfig::load(options.config_path.as_deref())?;
    run_with_config(&config, options, collaborators)
}

/// Runs the full pipeline against an already loaded configuration.
pub fn run_with_config(
    config: &CleanerConfig,
    options: &RunOptions,
    collaborators: Collaborators<'_>,
) -> Result<RunSummary, RunError> {
    let Collaborators {
        confirm,
        notifier,
        cancel,
    } = collaborators;
    let settings = &config.settings;

    let rules = config.compile()?;
    let watched = config.watched_folder();

    OutputFormatter::header("Making sure file destinations are valid.");
    let missing = rules.missing_destinations();
    if missing.is_empty() {
        OutputFormatter::info("> All destinations are valid.");
    } else {
        OutputFormatter::warning("The parent folders of these destinations are missing:");
        for dest in &missing {
            OutputFormatter::plain(&format!("  {}", dest.display()));
        }
        if !options.dry_run && !confirm.confirm("Do you want to continue?") {
            OutputFormatter::plain("Aborted; nothing was changed.");
            return Ok(RunSummary::Aborted { missing });
        }
    }

    if cancel.is_cancelled() {
        OutputFormatter::warning("Cancelled before scanning; nothing was changed.");
        return Ok(RunSummary::Cancelled {
            deleted: Vec::new(),
        });
    }

    OutputFormatter::header(&format!("Checking for new files in {}", watched.display()));
    let plan = QueueBuilder::new(&rules)
        .ask_to_delete(settings.ask_to_delete && !options.dry_run)
        .with_cancel(cancel.clone())
        .build(&watched, confirm)?;

    if !plan.deleted.is_empty() {
        OutputFormatter::info(&format!("> Deleted {} file(s) on request.", plan.deleted.len()));
    }

    if cancel.is_cancelled() {
        OutputFormatter::warning("Cancelled before moving any files.");
        return Ok(RunSummary::Cancelled {
            deleted: plan.deleted,
        });
    }

    if plan.is_empty() {
        OutputFormatter::info("> No new files found.");
        // Runs regardless of `delete_empty_folders` when nothing needs moving
        let cleanup = if !options.dry_run {
            sweep_empty_folders(&watched)
        } else {
            None
        };
        return Ok(RunSummary::NothingToDo {
            deleted: plan.deleted,
            cleanup,
        });
    }

    OutputFormatter::plan_summary(&plan);

    if options.dry_run {
        print_dry_run(&plan);
        return Ok(RunSummary::DryRun { plan });
    }

    OutputFormatter::header("Starting Folder Clean | Use Ctrl C if you need to cancel");
    let mut executor = MoveExecutor::new(cancel)
        .with_progress(progress_reporter(settings.progress_bar, settings.ascii_bar));
    if settings.rename {
        executor = executor.with_renamer(Renamer::new(&rules.rename_rules));
    }
    if settings.delete_empty_folders {
        executor = executor.with_cleanup(watched.clone());
    }
    let report = executor.execute(&plan);

    let mut manifest = Manifest::new(watched);
    manifest.moved = report.moved.clone();
    manifest.failed = report.failed.clone();
    manifest.cancelled = report.is_cancelled();

    report_outcome(&report);

    if settings.completion_signal {
        notifier.notify();
    }

    if !manifest.moved.is_empty()
        && (manifest.moved.len() <= MANIFEST_PROMPT_THRESHOLD
            || confirm.confirm("Do you want to see the file manifest?"))
    {
        OutputFormatter::manifest(&manifest);
    }
    OutputFormatter::failures(&manifest);

    if let Some(path) = &options.manifest_path {
        save_manifest(&manifest, path);
    }

    Ok(RunSummary::Finished { report, manifest })
}

fn sweep_empty_folders(dir: &Path) -> Option<CleanupReport> {
    OutputFormatter::header("Checking for empty directories.");
    match clean_empty_folders(dir) {
        Ok(report) => {
            print_cleanup(&report);
            Some(report)
        }
        Err(e) => {
            OutputFormatter::warning(&format!(
                "Could not check {} for empty folders: {}",
                dir.display(),
                e
            ));
            None
        }
    }
}

fn print_cleanup(report: &CleanupReport) {
    OutputFormatter::info(&format!("> {}", report.describe()));
    for (path, reason) in &report.failed {
        OutputFormatter::warning(&format!("Failed to delete {}: {}", path.display(), reason));
    }
}

fn print_dry_run(plan: &MovePlan) {
    OutputFormatter::header("DRY RUN: Files would be moved as follows:");
    for entry in plan.entries() {
        OutputFormatter::plain(&format!(
            " - {} ({})",
            entry.file_name,
            format_size(entry.file_size)
        ));
        OutputFormatter::plain(&format!(
            "   → Would move to {}",
            entry.destination_dir.display()
        ));
    }
    OutputFormatter::destination_table(plan);
    OutputFormatter::dry_run_notice("No files were modified.");
}

fn report_outcome(report: &ExecutionReport) {
    match &report.outcome {
        Outcome::Completed => {
            if report.failed.is_empty() {
                OutputFormatter::success("All files have been moved");
            } else {
                OutputFormatter::warning(&format!(
                    "{} of {} files moved; {} failed",
                    report.moved.len(),
                    report.planned,
                    report.failed.len()
                ));
            }
            if let Some(cleanup) = &report.cleanup {
                OutputFormatter::header("Checking for empty directories.");
                print_cleanup(cleanup);
            }
            OutputFormatter::header("Folder Clean Complete");
        }
        Outcome::Cancelled { interrupted } => {
            if let Some(entry) = interrupted {
                let status = match entry.state {
                    InterruptedState::Placed => "finished moving",
                    InterruptedState::Failed => "was not moved",
                    InterruptedState::PartialRemoved => "was not moved; removed partial copy",
                };
                OutputFormatter::plain(&format!(
                    "{} {} ({})",
                    entry.file_name,
                    status,
                    entry.destination.display()
                ));
            }
            OutputFormatter::warning(&format!(
                "Cancelled folder clean: {} of {} completed",
                report.moved.len(),
                report.planned
            ));
        }
    }
}

fn save_manifest(manifest: &Manifest, path: &Path) {
    match manifest.save(path) {
        Ok(()) => OutputFormatter::info(&format!("Manifest saved to {}", path.display())),
        Err(e) => OutputFormatter::warning(&format!("Could not save manifest: {}", e)),
    }
}
