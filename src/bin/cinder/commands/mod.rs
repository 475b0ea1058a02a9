//! Command implementations

pub mod build;
pub mod classify;
pub mod deps;
pub mod variants;

use anyhow::{Context, Result};

use cinder::ops::Manifest;
use cinder::util::config::load_for_project;
use cinder::util::Config;

use crate::cli::GlobalArgs;

/// Load the project manifest and the configuration that applies to it.
pub fn open_project(global: &GlobalArgs) -> Result<(Manifest, Config)> {
    let manifest_path = match &global.manifest_path {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir().context("failed to get current directory")?;
            Manifest::find(&cwd)?
        }
    };
    let manifest = Manifest::load(&manifest_path)?;
    let config = load_for_project(manifest.root());
    Ok((manifest, config))
}
