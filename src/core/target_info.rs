//! Build targets: one output file, its sources and the configuration used.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single build output.
///
/// `C` is the configuration type that produces the output: a compiler
/// configuration for object files, a linker configuration for the final
/// artifact.
#[derive(Debug)]
pub struct TargetInfo<C> {
    name: String,
    sources: Vec<PathBuf>,
    output: PathBuf,
    config: Arc<C>,
    rebuild: bool,
}

impl<C> Clone for TargetInfo<C> {
    fn clone(&self) -> Self {
        TargetInfo {
            name: self.name.clone(),
            sources: self.sources.clone(),
            output: self.output.clone(),
            config: Arc::clone(&self.config),
            rebuild: self.rebuild,
        }
    }
}

impl<C> TargetInfo<C> {
    /// Create a target for `output`, built from `sources`.
    pub fn new(
        name: impl Into<String>,
        sources: Vec<PathBuf>,
        output: PathBuf,
        config: Arc<C>,
        rebuild: bool,
    ) -> Self {
        TargetInfo {
            name: name.into(),
            sources,
            output,
            config,
            rebuild,
        }
    }

    /// Output file name without directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Files this target is built from, in visit order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// The file that first claimed this output.
    pub fn first_source(&self) -> Option<&Path> {
        self.sources.first().map(PathBuf::as_path)
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn config(&self) -> &Arc<C> {
        &self.config
    }

    /// Whether the target must be rebuilt regardless of timestamps.
    pub fn rebuild(&self) -> bool {
        self.rebuild
    }
}
