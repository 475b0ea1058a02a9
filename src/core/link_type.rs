//! Link type flags consumed by every linker's argument synthesis.

use serde::{Deserialize, Serialize};

/// Kind of artifact a link step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// An executable (default)
    #[default]
    #[serde(alias = "exe")]
    Executable,
    /// A shared library (`.so`, `.dylib`)
    #[serde(alias = "dylib", alias = "shared-library")]
    Shared,
    /// A loadable plugin module (`.bundle` on Darwin)
    #[serde(alias = "bundle")]
    Plugin,
    /// A static archive
    #[serde(alias = "staticlib", alias = "static-library")]
    Static,
}

/// Runtime library linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    #[default]
    Dynamic,
    Static,
}

/// Executable subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    #[default]
    Console,
    Gui,
    Other,
}

/// Immutable description of what a link step should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LinkType {
    output: OutputType,
    runtime: Runtime,
    subsystem: Subsystem,
    high_level_tool: bool,
}

impl LinkType {
    /// Create a link type with a dynamic runtime and console subsystem.
    pub fn new(output: OutputType) -> Self {
        LinkType {
            output,
            ..Default::default()
        }
    }

    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_subsystem(mut self, subsystem: Subsystem) -> Self {
        self.subsystem = subsystem;
        self
    }

    /// Build static libraries with the compiler driver instead of `ar`.
    pub fn with_high_level_tool(mut self, high_level: bool) -> Self {
        self.high_level_tool = high_level;
        self
    }

    pub fn output(&self) -> OutputType {
        self.output
    }

    pub fn is_executable(&self) -> bool {
        self.output == OutputType::Executable
    }

    pub fn is_static_library(&self) -> bool {
        self.output == OutputType::Static
    }

    /// True for shared libraries and plugin modules alike.
    pub fn is_shared_library(&self) -> bool {
        matches!(self.output, OutputType::Shared | OutputType::Plugin)
    }

    pub fn is_plugin_module(&self) -> bool {
        self.output == OutputType::Plugin
    }

    pub fn is_static_runtime(&self) -> bool {
        self.runtime == Runtime::Static
    }

    pub fn is_subsystem_console(&self) -> bool {
        self.subsystem == Subsystem::Console
    }

    pub fn is_subsystem_gui(&self) -> bool {
        self.subsystem == Subsystem::Gui
    }

    pub fn use_high_level_tool(&self) -> bool {
        self.high_level_tool
    }
}
