//! Command-line interface for parex
//!
//! Everything around the worker pool lives here: argument parsing, input
//! selection, logging setup and turning Ctrl-C into cancellation. The first
//! interrupt lets running commands finish and stops taking new records; a
//! second one exits immediately.

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod output;

pub use output::Output;

use crate::command::CommandSpec;
use crate::config::ParexConfig;
use crate::input::NUL;
use crate::parallel::{CancelSignal, CancelState, RunSummary, WorkerPool};
use crate::shared::SyncWriter;

/// Exit code when a run was stopped by Ctrl-C
pub const EXIT_INTERRUPTED: i32 = 130;

/// Run a command for every line of input, in parallel
#[derive(Parser, Debug)]
#[command(
    name = "parex",
    version,
    about = "Run a command for every line of input, in parallel",
    long_about = "parex reads records from stdin (or --arg-file) and runs COMMAND once per record, \
                  with the record appended as the last argument. With --template, each record is \
                  rendered into a full command line instead, e.g. \
                  parex -t 'convert {{ Input }} {{ noExt(Input) }}.png'."
)]
pub struct Cli {
    /// Maximum number of commands to run at once [default: logical cores]
    #[arg(short, long, value_name = "N", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub jobs: Option<usize>,

    /// Read records from PATH instead of stdin
    #[arg(short = 'a', long = "arg-file", value_name = "PATH")]
    pub arg_file: Option<PathBuf>,

    /// Records are separated by NUL bytes instead of newlines
    #[arg(short = '0', long)]
    pub null: bool,

    /// Command template rendered for every record (overrides per-record argument appending)
    #[arg(short, long, value_name = "TEMPLATE")]
    pub template: Option<String>,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", env = "PAREX_CONFIG")]
    pub config: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress logging and status messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Program to run, followed by its arguments
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Run to completion and return the process exit code
    pub async fn run(self) -> Result<i32> {
        let config = ParexConfig::load_with_custom_config(self.config.as_deref())?;
        setup_logging(self.verbose, self.quiet, &config.logging.level);
        let output = Output::new(self.verbose > 0, self.quiet);

        let command = self.command_spec(&output)?;
        let mut options = config.pool_options(self.jobs);
        if self.null {
            options = options.with_delimiter(NUL);
        }
        let input = open_input(self.arg_file.as_deref())?;

        let pool = WorkerPool::new(
            options,
            command,
            input,
            Arc::new(SyncWriter::new(io::stdout())),
            Arc::new(SyncWriter::new(io::stderr())),
        )?;
        tracing::info!(jobs = pool.concurrency(), "Starting");

        let watcher = tokio::spawn(watch_interrupts(pool.cancel_signal(), output));
        let summary = tokio::task::spawn_blocking(move || pool.run())
            .await
            .context("Worker pool task failed")??;
        watcher.abort();

        if let Some(e) = &summary.read_error {
            output.error(&format!("Could not read from input: {e}"));
        }
        output.verbose_summary("∑", "Records processed", summary.dispatched);
        if summary.failed > 0 {
            output.verbose_summary("✖", "Records failed", summary.failed);
        }

        Ok(exit_code(&summary))
    }

    fn command_spec(&self, output: &Output) -> Result<CommandSpec> {
        match (&self.template, self.command.split_first()) {
            (Some(template), program) => {
                if let Some((_, extra)) = program
                    && !extra.is_empty()
                {
                    output.warning(&format!(
                        "Ignoring arguments {extra:?}: --template builds the whole command line"
                    ));
                }
                CommandSpec::templated(template, program.map(|(name, _)| name.as_str()))
            }
            (None, Some((program, args))) => CommandSpec::direct(program, args),
            (None, None) => Cli::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    "Must specify a command to execute",
                )
                .exit(),
        }
    }
}

fn open_input(arg_file: Option<&Path>) -> Result<Box<dyn Read + Send>> {
    match arg_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Could not read from input: {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin())),
    }
}

/// First Ctrl-C cancels gracefully, the second exits on the spot
async fn watch_interrupts(signal: CancelSignal, output: Output) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if let Some(code) = on_interrupt(&signal, output) {
            std::process::exit(code);
        }
    }
}

/// Advance the cancel state for one interrupt. Returns the exit code when
/// the process should stop immediately.
fn on_interrupt(signal: &CancelSignal, output: Output) -> Option<i32> {
    match signal.interrupt() {
        CancelState::Cancelling => {
            tracing::debug!("Cancellation requested");
            output.warning(
                "Interrupted, waiting for running commands to finish (Ctrl-C again to quit now)",
            );
            None
        }
        _ => {
            tracing::debug!("Forced exit requested");
            output.warning("Interrupted again, exiting without waiting");
            Some(EXIT_INTERRUPTED)
        }
    }
}

pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.cancelled {
        EXIT_INTERRUPTED
    } else if summary.is_success() {
        0
    } else {
        1
    }
}

fn setup_logging(verbose: u8, quiet: bool, base_level: &str) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new(base_level),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // A subscriber may already be installed when embedded; keep that one
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_trailing_command_keeps_its_flags() {
        let cli = Cli::try_parse_from(["parex", "-j", "3", "echo", "-n", "--x"]).unwrap();
        assert_eq!(cli.jobs, Some(3));
        assert_eq!(cli.command, vec!["echo", "-n", "--x"]);
    }

    #[test]
    fn test_zero_jobs_is_rejected() {
        assert!(Cli::try_parse_from(["parex", "-j", "0", "echo"]).is_err());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["parex", "-0", "-a", "list.txt", "-t", "echo {{ Input }}"])
            .unwrap();
        assert!(cli.null);
        assert_eq!(cli.arg_file, Some(PathBuf::from("list.txt")));
        assert_eq!(cli.template.as_deref(), Some("echo {{ Input }}"));
        assert!(cli.command.is_empty());
    }

    #[test]
    fn test_exit_codes() {
        let mut summary = RunSummary::default();
        assert_eq!(exit_code(&summary), 0);

        summary.failed = 2;
        assert_eq!(exit_code(&summary), 1);

        summary.cancelled = true;
        assert_eq!(exit_code(&summary), EXIT_INTERRUPTED);

        let summary = RunSummary {
            read_error: Some(io::Error::other("boom")),
            ..RunSummary::default()
        };
        assert_eq!(exit_code(&summary), 1);
    }

    #[test]
    fn test_second_interrupt_forces_exit() {
        let signal = CancelSignal::new();
        let output = Output::new(false, true);

        assert_eq!(on_interrupt(&signal, output), None);
        assert_eq!(signal.state(), CancelState::Cancelling);
        assert!(signal.is_cancelled());

        assert_eq!(on_interrupt(&signal, output), Some(EXIT_INTERRUPTED));
        assert_eq!(signal.state(), CancelState::ForceExit);

        // Further presses keep exiting
        assert_eq!(on_interrupt(&signal, output), Some(EXIT_INTERRUPTED));
    }

    #[test]
    fn test_missing_arg_file_fails_at_startup() {
        let err = open_input(Some(Path::new("/definitely/not/here.txt"))).err().unwrap();
        assert!(err.to_string().contains("Could not read from input"));
    }
}
