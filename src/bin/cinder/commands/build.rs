//! `cinder build` command

use anyhow::Result;

use crate::cli::{BuildArgs, GlobalArgs};
use cinder::builder::ProcessRunner;
use cinder::ops::{BuildOptions, BuildSession, ToolEnvironment};

pub fn execute(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let (manifest, config) = super::open_project(global)?;
    let name = manifest.project.name.clone();

    let runner = ProcessRunner;
    let session = BuildSession::new(manifest, config, &ToolEnvironment::from_env(), &runner)?;

    let options = BuildOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        relentless: args.relentless,
        progress: !global.verbose,
    };
    let report = session.build(&options)?;

    if args.dry_run {
        for argv in &report.commands {
            println!("{}", argv.join(" "));
        }
        return Ok(());
    }

    tracing::info!(
        "Finished {}: {} compiled, {} up to date{}",
        name,
        report.compiled.len(),
        report.up_to_date,
        if report.linked.is_some() { ", linked" } else { "" }
    );
    Ok(())
}
