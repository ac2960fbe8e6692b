//! dirsweep - rule-driven cleanup of a watched folder
//!
//! This library scans a single folder, classifies each file by extension,
//! filename keyword, or special-case override, and moves matched files into
//! configured destination directories. Files can optionally be renamed on the
//! way, configured junk can be deleted on request, and empty folders left
//! behind are removed.

pub mod classifier;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod executor;
pub mod manifest;
pub mod output;
pub mod prompt;
pub mod queue;
pub mod rename;
pub mod rules;

pub use classifier::{SkipReason, Verdict, classify};
pub use config::{CleanerConfig, ConfigError};
pub use executor::{CancellationToken, ExecutionReport, MoveExecutor};
pub use queue::{MoveEntry, MovePlan, QueueBuilder};
pub use rename::Renamer;
pub use rules::{Destination, RuleSet};

pub use cli::{Collaborators, RunOptions, RunSummary, run_cli};
