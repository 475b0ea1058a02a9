//! Cinder - an incremental build orchestrator for native toolchains
//!
//! This crate provides the core library functionality for Cinder:
//! file classification, include dependency tracking, and compiler and
//! linker command synthesis.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for Cinder unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording command runner and project
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use builder::{CompilerConfiguration, DependencyTable, LinkerConfiguration};
pub use ops::{BuildSession, Manifest};
pub use util::{BuildError, BuildResult, Config};
