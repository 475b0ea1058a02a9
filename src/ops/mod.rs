//! High-level operations.
//!
//! This module contains the implementation of Cinder commands.

pub mod cinder_build;
pub mod cinder_variants;
pub mod manifest;

pub use cinder_build::{BuildOptions, BuildReport, BuildSession, ToolEnvironment};
pub use cinder_variants::{format_table, variants, VariantRow};
pub use manifest::{Manifest, PrecompileSection, ProjectSection, MANIFEST_NAME};
