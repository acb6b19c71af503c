//! CLI argument definitions for `bulkedit`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use bulkedit_cli::pipeline::OptionOverrides;

#[derive(Parser)]
#[command(
    name = "bulkedit",
    version,
    about = "Batch metadata import: create and update records from CSV or JSON rows",
    long_about = "Import a batch of rows into a record store.\n\n\
                  Rows may reference each other by rowName or by metadata value.\n\
                  References are resolved, relations are checked against the\n\
                  relationship type catalog, and changes are committed in checkpoints."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include cell values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve and validate a batch, print the changes, write nothing.
    Preview(RunArgs),

    /// Resolve, validate and apply a batch.
    Apply(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Rows to import (.csv or .json).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Store snapshot (JSON). `apply` writes committed changes back to it.
    #[arg(long = "store", value_name = "FILE")]
    pub store: PathBuf,

    /// Relationship type catalog (JSON array).
    #[arg(long = "catalog", value_name = "FILE")]
    pub catalog: PathBuf,

    /// Content type of INPUT (default: inferred from its extension).
    #[arg(long = "content-type", value_name = "TYPE")]
    pub content_type: Option<String>,

    /// Import options (JSON); flags below override it.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Records per commit checkpoint.
    #[arg(long = "checkpoint-size", value_name = "N")]
    pub checkpoint_size: Option<usize>,

    /// Allow the `expunge` action.
    #[arg(long = "allow-expunge")]
    pub allow_expunge: bool,

    /// Create new records from their container's template.
    #[arg(long = "use-template")]
    pub use_template: bool,

    /// Send new records into the review workflow.
    #[arg(long = "use-workflow")]
    pub use_workflow: bool,

    /// Notify reviewers when a workflow starts.
    #[arg(long = "notify", requires = "use_workflow")]
    pub notify: bool,

    /// Leave new records in progress instead of archiving them.
    #[arg(long = "no-archive")]
    pub no_archive: bool,

    /// Field whose stored authority takes part in comparison (repeatable).
    #[arg(long = "authority-field", value_name = "FIELD")]
    pub authority_fields: Vec<String>,

    /// Write a JSON report of the run.
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            checkpoint_size: self.checkpoint_size,
            allow_expunge: self.allow_expunge,
            use_template: self.use_template,
            use_workflow: self.use_workflow,
            notify_on_workflow_start: self.notify,
            no_archive: self.no_archive,
            authority_fields: self.authority_fields.clone(),
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
