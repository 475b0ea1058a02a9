//! Cinder CLI - incremental builds for native toolchains

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("cinder=debug")
    } else {
        EnvFilter::new("cinder=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let global = cli::GlobalArgs {
        verbose: cli.verbose,
        manifest_path: cli.manifest_path,
    };

    match cli.command {
        Commands::Build(args) => commands::build::execute(&global, args),
        Commands::Classify => commands::classify::execute(&global),
        Commands::Deps(args) => commands::deps::execute(&global, args),
        Commands::Variants(args) => commands::variants::execute(args),
    }
}
