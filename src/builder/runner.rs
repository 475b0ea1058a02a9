//! The seam between command synthesis and process execution.

use std::path::Path;

use crate::util::errors::{BuildError, BuildResult};
use crate::util::process::ToolProcess;

/// Result of running an external tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit code; `-1` when the process was killed by a signal
    pub code: i32,

    /// Captured standard output, one entry per line
    pub stdout: Vec<String>,

    /// Captured standard error
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs an argv and reports its exit code and output.
pub trait CommandRunner: Send + Sync {
    /// Run `argv` in `cwd`. With `new_environment` the child starts from an
    /// empty environment.
    fn run(&self, argv: &[String], cwd: Option<&Path>, new_environment: bool)
        -> BuildResult<RunOutput>;
}

/// Runs commands as real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        new_environment: bool,
    ) -> BuildResult<RunOutput> {
        let tool = argv.first().cloned().unwrap_or_default();
        let mut process = ToolProcess::new(argv)
            .ok_or_else(|| BuildError::ToolSpawn {
                tool: tool.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            })?
            .clean_env(new_environment);
        if let Some(dir) = cwd {
            process = process.cwd(dir);
        }

        tracing::debug!("running `{}`", process.display_command());

        let output = process.exec().map_err(|e| BuildError::ToolSpawn {
            tool: tool.clone(),
            source: std::io::Error::other(format!("{:#}", e)),
        })?;

        Ok(RunOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_string)
                .collect(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
