use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dirsync",
    about = "Keep curated YAML directory files in sync with their sources",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file; defaults apply if it does not exist
    #[arg(long, global = true, default_value = "dirsync.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch, merge, validate and write every category
    Sync(SyncArgs),
    /// Validate every category file on disk
    Validate(ValidateArgs),
    /// Snapshot the data directory
    Backup(BackupArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Read `{category}.json` payloads from this directory instead of the API
    #[arg(long)]
    pub fixtures: Option<PathBuf>,
    /// Only sync these categories (repeatable)
    #[arg(long = "category", short = 'c')]
    pub categories: Vec<String>,
    /// Do not write the metrics file
    #[arg(long)]
    pub no_metrics: bool,
}

#[derive(Args)]
pub struct ValidateArgs {}

#[derive(Args)]
pub struct BackupArgs {}

#[derive(Args)]
pub struct ConfigArgs {}
