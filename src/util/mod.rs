//! Shared utilities

pub mod config;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;

pub use config::Config;
pub use errors::{BuildError, BuildResult};
