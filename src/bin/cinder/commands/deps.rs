//! `cinder deps` command

use anyhow::{Context, Result};

use crate::cli::{DepsArgs, GlobalArgs};
use cinder::builder::ProcessRunner;
use cinder::ops::{BuildSession, ToolEnvironment};

pub fn execute(global: &GlobalArgs, args: DepsArgs) -> Result<()> {
    let file = if args.file.is_absolute() {
        args.file
    } else {
        std::env::current_dir()
            .context("failed to get current directory")?
            .join(args.file)
    };

    let (manifest, config) = super::open_project(global)?;
    let runner = ProcessRunner;
    let session = BuildSession::new(manifest, config, &ToolEnvironment::from_env(), &runner)?;

    let info = session.dependencies(&file)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
