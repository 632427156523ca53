use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Top-level CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "promptcast",
    version,
    about = "Run templated prompt configurations against an LLM and deliver the result",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a prompt configuration end to end.
    Run(RunArgs),
    /// List prompt configurations discoverable in the prompts directory.
    List(ListArgs),
    /// Resolve and validate a prompt configuration without calling any backend.
    Validate(ValidateArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Prompt name (searched in the prompts directory) or a path to a YAML file.
    pub prompt: String,

    /// Profile YAML merged into the template context.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub profile: Option<PathBuf>,

    /// Directory to search for prompts instead of walking parent directories.
    #[arg(long = "prompts-dir", value_hint = ValueHint::DirPath)]
    pub prompts_dir: Option<PathBuf>,

    /// Skip the delivery stage even when recipients are configured.
    #[arg(long = "no-delivery", action = ArgAction::SetTrue)]
    pub no_delivery: bool,

    /// Write the response to a file instead of printing it.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Validate the configuration and exit without contacting any backend.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,
}

/// Arguments for the `list` subcommand.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Directory to search for prompts instead of walking parent directories.
    #[arg(long = "prompts-dir", value_hint = ValueHint::DirPath)]
    pub prompts_dir: Option<PathBuf>,
}

/// Arguments for the `validate` subcommand.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Prompt name (searched in the prompts directory) or a path to a YAML file.
    pub prompt: String,

    /// Profile YAML merged into the template context.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub profile: Option<PathBuf>,

    /// Directory to search for prompts instead of walking parent directories.
    #[arg(long = "prompts-dir", value_hint = ValueHint::DirPath)]
    pub prompts_dir: Option<PathBuf>,
}
