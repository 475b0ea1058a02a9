//! Subprocess execution for toolchain commands.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

/// One tool invocation: program, arguments and where to run it.
#[derive(Debug, Clone)]
pub struct ToolProcess {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    clean_env: bool,
}

impl ToolProcess {
    /// Wrap a full argv, the first element being the program.
    ///
    /// Returns `None` for an empty argv.
    pub fn new(argv: &[String]) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        Some(ToolProcess {
            argv: argv.to_vec(),
            cwd: None,
            clean_env: false,
        })
    }

    /// Start from an empty environment instead of inheriting ours.
    pub fn clean_env(mut self, clean: bool) -> Self {
        self.clean_env = clean;
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Run to completion with stdin closed, capturing both output streams.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = Command::new(self.program());
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.clean_env {
            cmd.env_clear();
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.output()
            .with_context(|| format!("failed to spawn `{}`", self.program()))
    }

    /// The command as a single line, for logs.
    pub fn display_command(&self) -> String {
        self.argv.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_captures_stdout() {
        let output = ToolProcess::new(&argv(&["echo", "hello"]))
            .unwrap()
            .exec()
            .unwrap();

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_env_and_cwd() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = ToolProcess::new(&argv(&["/bin/sh", "-c", "pwd; echo \"[$HOME]\""]))
            .unwrap()
            .clean_env(true)
            .cwd(tmp.path())
            .exec()
            .unwrap();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let name = tmp.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(stdout.lines().next().unwrap().ends_with(&name));
        assert!(stdout.contains("[]"));
    }

    #[test]
    fn test_program_and_args() {
        let process = ToolProcess::new(&argv(&["ar", "rvs", "libx.a"])).unwrap();
        assert_eq!(process.program(), "ar");
        assert_eq!(process.args(), &["rvs", "libx.a"]);
        assert_eq!(process.display_command(), "ar rvs libx.a");
        assert!(ToolProcess::new(&[]).is_none());
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let err = ToolProcess::new(&argv(&["cinder-no-such-tool-xyz"]))
            .unwrap()
            .exec()
            .unwrap_err();
        assert!(format!("{:#}", err).contains("cinder-no-such-tool-xyz"));
    }
}
