use clap::Parser;
use dirsweep::cli::{Collaborators, RunOptions, RunSummary, run_cli};
use dirsweep::executor::CancellationToken;
use dirsweep::output::OutputFormatter;
use dirsweep::prompt::{
    AssumeAnswer, CompletionNotifier, Confirm, SilentNotifier, StdinConfirm, TerminalBell,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Sweep a watched folder into rule-based destinations.
#[derive(Debug, Parser)]
#[command(name = "dirsweep", version, about)]
struct Args {
    /// Configuration file (defaults to ~/.config/dirsweep/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show what would be moved without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Answer yes to every prompt
    #[arg(short, long)]
    yes: bool,

    /// Also write the manifest as JSON to this file
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Do not ring the terminal bell when finished
    #[arg(long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "dirsweep=info",
        _ => "dirsweep=debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    OutputFormatter::header("dirsweep");

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler; cancellation disabled");
    }

    let mut assume_yes = AssumeAnswer::YES;
    let mut stdin_confirm;
    let confirm: &mut dyn Confirm = if args.yes {
        &mut assume_yes
    } else {
        stdin_confirm = StdinConfirm::stdin();
        &mut stdin_confirm
    };
    let notifier: &dyn CompletionNotifier = if args.quiet {
        &SilentNotifier
    } else {
        &TerminalBell
    };

    let options = RunOptions {
        config_path: args.config,
        dry_run: args.dry_run,
        manifest_path: args.manifest,
    };

    match run_cli(
        &options,
        Collaborators {
            confirm,
            notifier,
            cancel,
        },
    ) {
        Ok(RunSummary::Finished { report, .. }) if !report.failed.is_empty() => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
