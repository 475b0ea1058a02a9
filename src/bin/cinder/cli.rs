//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Cinder - incremental builds for native toolchains
#[derive(Parser)]
#[command(name = "cinder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to Cinder.toml (defaults to searching upward from the current directory)
    #[arg(long, global = true)]
    pub manifest_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every project command.
pub struct GlobalArgs {
    pub verbose: bool,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile stale sources and link the project
    Build(BuildArgs),

    /// Show which compiler builds each source and what goes to the linker
    Classify,

    /// Print the include dependencies of a source as JSON
    Deps(DepsArgs),

    /// Print the linker decision table
    Variants(VariantsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Print command lines instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Keep compiling after a failure and report every failed source
    #[arg(long)]
    pub relentless: bool,
}

#[derive(Args)]
pub struct DepsArgs {
    /// Source file to analyze
    pub file: PathBuf,
}

#[derive(Args)]
pub struct VariantsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
