//! The build core.
//!
//! This module classifies files, tracks include dependencies and turns
//! compiler and linker definitions into command lines.

pub mod command;
pub mod compiler;
pub mod dependency;
pub mod include_parser;
pub mod linker;
pub mod matcher;
pub mod processor;
pub mod runner;
pub mod toolchain_cache;

pub use command::{CommandLine, ResponseSwitch};
pub use compiler::{CompilerConfiguration, CompilerContext, CompilerKind, PrecompileSplit};
pub use dependency::{DependencyAnalyzer, DependencyTable, IncludeSearch, Staleness};
pub use linker::{LinkInput, LinkerConfiguration, LinkerContext, Origin};
pub use matcher::{classify, Classification, TargetMatcher};
pub use processor::{Compiler, Processor, BID_DISCARD, BID_NONE, BID_PROCESS};
pub use runner::{CommandRunner, ProcessRunner, RunOutput};
pub use toolchain_cache::ToolchainCache;
