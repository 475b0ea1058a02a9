//! Test utilities and mocks for Cinder unit tests.
//!
//! `RecordingRunner` stands in for the process runner: it records every argv
//! it is asked to run and answers with scripted output, so command synthesis
//! can be tested without a toolchain installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinder::test_support::RecordingRunner;
//!
//! let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
//! // hand `&runner` to code that takes `&dyn CommandRunner`...
//! assert_eq!(runner.calls()[0], vec!["gcc", "-dumpversion"]);
//! ```

pub mod fixtures;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::builder::runner::{CommandRunner, RunOutput};
use crate::util::errors::{BuildError, BuildResult};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Mock command runner that records calls and replays scripted output.
///
/// Scripted responses are consumed in order; once they run out every call
/// gets the default output (exit code 0, no output unless configured).
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    cwds: Mutex<Vec<Option<PathBuf>>>,
    responses: Mutex<VecDeque<RunOutput>>,
    default_output: RunOutput,
    spawn_fails: bool,
}

impl RecordingRunner {
    /// Create a runner where every command succeeds silently.
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    /// Every unscripted call prints these lines.
    pub fn with_stdout(mut self, lines: &[&str]) -> Self {
        self.default_output.stdout = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Every unscripted call exits with `code`.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.default_output.code = code;
        self
    }

    /// Queue an output for the next unanswered call.
    pub fn push_response(self, output: RunOutput) -> Self {
        lock(&self.responses).push_back(output);
        self
    }

    /// Every call fails as if the program did not exist.
    pub fn failing_spawn(mut self) -> Self {
        self.spawn_fails = true;
        self
    }

    /// Every argv run so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        lock(&self.calls).clone()
    }

    /// Working directory of every call so far.
    pub fn cwds(&self) -> Vec<Option<PathBuf>> {
        lock(&self.cwds).clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        _new_environment: bool,
    ) -> BuildResult<RunOutput> {
        lock(&self.calls).push(argv.to_vec());
        lock(&self.cwds).push(cwd.map(Path::to_path_buf));

        if self.spawn_fails {
            return Err(BuildError::ToolSpawn {
                tool: argv.first().cloned().unwrap_or_default(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        Ok(lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| self.default_output.clone()))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_and_cwds() {
        let runner = RecordingRunner::new();
        let argv = vec!["gcc".to_string(), "-c".to_string()];
        runner.run(&argv, Some(Path::new("/tmp")), false).unwrap();
        assert_eq!(runner.calls(), vec![argv]);
        assert_eq!(runner.cwds(), vec![Some(PathBuf::from("/tmp"))]);
    }

    #[test]
    fn test_scripted_then_default() {
        let runner = RecordingRunner::new()
            .with_exit_code(0)
            .push_response(RunOutput {
                code: 2,
                ..Default::default()
            });
        let argv = vec!["ld".to_string()];
        assert_eq!(runner.run(&argv, None, false).unwrap().code, 2);
        assert_eq!(runner.run(&argv, None, false).unwrap().code, 0);
    }

    #[test]
    fn test_failing_spawn() {
        let runner = RecordingRunner::new().failing_spawn();
        let err = runner.run(&["x".to_string()], None, false).unwrap_err();
        assert!(matches!(err, BuildError::ToolSpawn { .. }));
        assert_eq!(runner.calls().len(), 1);
    }
}
