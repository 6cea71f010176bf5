//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `resolve <entry>`: resolve one stage (or stage-group member), or the
//!   whole document with `--all`.
//! - `keys`: list concrete stage names, expanding `foreach`/`matrix` generators.
//! - `artifacts`/`datasets`/`metrics`/`params`/`plots`: eagerly resolve one
//!   top-level document section.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Command,
}

/// Arguments shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Pipeline document to resolve (overrides the config file default).
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// Stage name, or `parent@suffix` for a generated member.
    pub entry: Option<String>,

    /// Resolve every concrete stage instead of a single entry.
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct KeysCommand {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct SectionCommand {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve one stage, a generated member, or every stage with `--all`.
    Resolve(ResolveCommand),
    /// List concrete stage names, expanding generators.
    Keys(KeysCommand),
    /// Resolve the `artifacts` section.
    Artifacts(SectionCommand),
    /// Resolve the `datasets` section.
    Datasets(SectionCommand),
    /// Resolve the `metrics` section.
    Metrics(SectionCommand),
    /// Resolve the `params` section.
    Params(SectionCommand),
    /// Resolve the `plots` section.
    Plots(SectionCommand),
}
