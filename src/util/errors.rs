//! Build error taxonomy.
//!
//! Configuration errors and tool failures are fatal and carry enough context
//! (file names, output name, tool command) to diagnose without rerunning.
//! Parse errors and unresolved includes never surface here: they are
//! recovered where they happen.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result alias for the build core.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Fatal build error.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// Two different sources map to the same output file.
    #[error(
        "Output filename conflict: {output} would be produced from {} and {}",
        .first.display(),
        .second.display()
    )]
    #[diagnostic(
        code(cinder::config::output_collision),
        help("Rename one of the sources or build them into separate object directories")
    )]
    OutputCollision {
        output: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// An `extends` reference names a definition that does not exist.
    #[error("{kind} definition `{name}` is not defined")]
    #[diagnostic(code(cinder::config::unknown_definition))]
    UnknownDefinition { kind: &'static str, name: String },

    /// Layered definitions extend each other in a loop.
    #[error("definition cycle: {}", .chain.join(" -> "))]
    #[diagnostic(
        code(cinder::config::definition_cycle),
        help("Remove one of the `extends` references")
    )]
    DefinitionCycle { chain: Vec<String> },

    /// More than one concrete linker definition was supplied.
    #[error("only one linker may be active, found: {}", .names.join(", "))]
    #[diagnostic(
        code(cinder::config::multiple_linkers),
        help("Mark base linker definitions with `abstract = true`")
    )]
    MultipleLinkers { names: Vec<String> },

    /// A definition field holds a value the build core does not understand.
    #[error("invalid {what}: `{value}`")]
    #[diagnostic(code(cinder::config::invalid_value))]
    InvalidValue { what: &'static str, value: String },

    /// Precompiled headers were requested from a compiler that cannot produce them.
    #[error("compiler `{compiler}` does not support precompiled headers")]
    #[diagnostic(code(cinder::config::precompile_unsupported))]
    PrecompileUnsupported { compiler: String },

    /// The precompiled-header prototype has no include directive to split on.
    #[error(
        "precompiled header prototype {} contains no include directive",
        .prototype.display()
    )]
    #[diagnostic(
        code(cinder::config::precompile_boundary),
        help("The last include in the prototype marks the end of the precompiled headers")
    )]
    PrecompileNoBoundary { prototype: PathBuf },

    /// An external tool exited with a nonzero code.
    #[error("{tool} failed with return code {code} (in {})", .location.display())]
    #[diagnostic(code(cinder::tool::failed))]
    ToolFailed {
        tool: String,
        code: i32,
        location: PathBuf,
    },

    /// An external tool could not be started.
    #[error("failed to run `{tool}`")]
    #[diagnostic(code(cinder::tool::spawn))]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The command line is too long and the tool has no response-file switch.
    #[error("{tool} does not support command files")]
    #[diagnostic(code(cinder::tool::response_file_unsupported))]
    ResponseFileUnsupported { tool: String },

    /// A response file could not be written.
    #[error("failed to write response file {}", .path.display())]
    #[diagnostic(code(cinder::tool::response_file_write))]
    ResponseFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure while preparing or finishing a tool run.
    #[error("{context}")]
    #[diagnostic(code(cinder::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Whether the error came from the build description rather than a tool.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BuildError::OutputCollision { .. }
                | BuildError::UnknownDefinition { .. }
                | BuildError::DefinitionCycle { .. }
                | BuildError::MultipleLinkers { .. }
                | BuildError::InvalidValue { .. }
                | BuildError::PrecompileUnsupported { .. }
                | BuildError::PrecompileNoBoundary { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_message_names_both_sources() {
        let err = BuildError::OutputCollision {
            output: "a.o".to_string(),
            first: PathBuf::from("foo/a.c"),
            second: PathBuf::from("bar/a.c"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.o"));
        assert!(msg.contains("foo/a.c"));
        assert!(msg.contains("bar/a.c"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_tool_failure_message() {
        let err = BuildError::ToolFailed {
            tool: "gcc".to_string(),
            code: 2,
            location: PathBuf::from("/tmp/out"),
        };
        assert_eq!(
            err.to_string(),
            "gcc failed with return code 2 (in /tmp/out)"
        );
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_cycle_message() {
        let err = BuildError::DefinitionCycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "definition cycle: a -> b -> a");
    }
}
