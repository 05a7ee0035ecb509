use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tidy_duper::organize::conflict::ConflictStrategy;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "tidy-duper")]
#[command(about = "Organize files into category folders and remove duplicates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan sources and file everything into categorized destination folders
    Organize(OrganizeArgs),
    /// Remove duplicate files under a directory, keeping one copy each
    Dedupe(DedupeArgs),
    /// Print the effective configuration
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Source directories to scan
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Destination root for the category folders
    #[arg(short, long)]
    pub dest: PathBuf,

    /// Move files instead of copying them
    #[arg(long = "move")]
    pub move_files: bool,

    /// Compute every action without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Follow symbolic links while scanning
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Remove duplicates under the destination after organizing
    #[arg(long)]
    pub dedupe: bool,

    /// Naming scheme for destination name collisions
    #[arg(long, value_enum, default_value = "numbered")]
    pub strategy: ConflictStrategy,

    /// Rename on collision even when the content is byte-identical
    #[arg(long)]
    pub no_skip_identical: bool,

    /// Leave files with unmapped extensions behind instead of filing
    /// them under other/
    #[arg(long)]
    pub exclude_unknown: bool,

    /// Write a CSV transfer log to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DedupeArgs {
    /// Directory to deduplicate
    pub dir: PathBuf,
}
