//! Core data structures for Cinder.
//!
//! This module contains the plain data the build core passes around:
//! - Platform tags and link types
//! - Library sets and layered definitions
//! - Targets and dependency records

pub mod definition;
pub mod dependency_info;
pub mod library_set;
pub mod link_type;
pub mod platform;
pub mod target_info;

pub use definition::{ArgBuckets, ArgLocation, CompilerDef, DefArg, Layered, LinkerDef, Param};
pub use dependency_info::DependencyInfo;
pub use library_set::{LibrarySet, LibraryType};
pub use link_type::{LinkType, OutputType, Runtime, Subsystem};
pub use platform::{OsFamily, Platform};
pub use target_info::TargetInfo;
