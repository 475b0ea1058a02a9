//! `cinder classify` command

use anyhow::Result;

use crate::cli::GlobalArgs;
use cinder::builder::ProcessRunner;
use cinder::ops::{BuildSession, ToolEnvironment};
use cinder::util::fs::portable_relative;

pub fn execute(global: &GlobalArgs) -> Result<()> {
    let (manifest, config) = super::open_project(global)?;
    let runner = ProcessRunner;
    let session = BuildSession::new(manifest, config, &ToolEnvironment::from_env(), &runner)?;
    let root = session.manifest().root().to_path_buf();

    let classification = session.classify()?;

    for (name, target) in &classification.targets {
        let sources: Vec<String> = target
            .sources()
            .iter()
            .map(|s| portable_relative(&root, s))
            .collect();
        println!("{} <- {} [{}]", name, sources.join(" "), target.config().name());
    }
    for object in &classification.objects {
        println!("link: {}", portable_relative(&root, object));
    }
    if global.verbose {
        for dropped in &classification.dropped {
            println!("ignored: {}", portable_relative(&root, dropped));
        }
    }

    Ok(())
}
