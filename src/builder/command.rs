//! Command-line assembly and the response-file fallback.
//!
//! A command line is a fixed prefix (`libtool`, `xcrun`, the tool itself)
//! followed by arguments. When the whole line is too long for the tool,
//! everything after the prefix moves into a response file and the line
//! becomes `prefix <switch><file>`.

use std::path::{Path, PathBuf};

use crate::builder::runner::{CommandRunner, RunOutput};
use crate::util::errors::{BuildError, BuildResult};
use crate::util::fs::{normalize_path, quote_filename, relative_path};

/// How a tool accepts a response file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSwitch {
    /// `@<file>`
    At,
    /// The tool has no response-file switch.
    Unsupported,
}

impl ResponseSwitch {
    fn argument(&self, tool: &str, file: &Path) -> BuildResult<String> {
        match self {
            ResponseSwitch::At => Ok(format!("@{}", file.display())),
            ResponseSwitch::Unsupported => Err(BuildError::ResponseFileUnsupported {
                tool: tool.to_string(),
            }),
        }
    }
}

/// An argv with a known fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    argv: Vec<String>,
    prefix_len: usize,
}

impl CommandLine {
    /// Start a command line from its fixed prefix, ending with the tool.
    pub fn new<I, S>(prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = prefix.into_iter().map(Into::into).collect();
        let prefix_len = argv.len();
        CommandLine { argv, prefix_len }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn into_argv(self) -> Vec<String> {
        self.argv
    }

    /// Number of leading arguments that never move into a response file.
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// The tool named by the last prefix argument.
    pub fn tool(&self) -> &str {
        self.prefix_len
            .checked_sub(1)
            .and_then(|i| self.argv.get(i))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Total length with one separator per argument.
    pub fn length(&self) -> usize {
        command_length(&self.argv)
    }

    /// Fall back to a response file at `path` when the line is at least
    /// `max_len` long. Shorter lines are returned untouched and nothing is
    /// written.
    pub fn fit(
        self,
        max_len: usize,
        switch: ResponseSwitch,
        path: &Path,
    ) -> BuildResult<CommandLine> {
        if self.length() < max_len {
            return Ok(self);
        }

        let switch_arg = switch.argument(self.tool(), path)?;
        write_response_file(path, &self.argv[self.prefix_len..])?;
        tracing::debug!(
            "command line of {} characters moved to {}",
            self.length(),
            path.display()
        );

        let mut argv = self.argv[..self.prefix_len].to_vec();
        argv.push(switch_arg);
        Ok(CommandLine {
            argv,
            prefix_len: self.prefix_len,
        })
    }
}

/// Sum of argument lengths plus one separator each.
pub fn command_length(argv: &[String]) -> usize {
    argv.iter().map(|a| a.len() + 1).sum()
}

/// Response file for an output: `<output name>.rsp` beside the output.
pub fn response_file_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}.rsp", name))
}

/// Canonical directory of `output`. Tools writing `output` run there.
pub fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => normalize_path(p),
        _ => normalize_path(Path::new(".")),
    }
}

/// An input file as it appears on a command line run from `output_dir`.
pub fn prepare_filename(output_dir: &Path, source: &Path) -> String {
    let rel = relative_path(output_dir, source);
    if rel.as_os_str().is_empty() {
        return ".".to_string();
    }
    quote_filename(&rel.to_string_lossy())
}

/// Write one argument per line, quoting unquoted arguments with spaces.
pub fn write_response_file(path: &Path, args: &[String]) -> BuildResult<()> {
    let mut content = String::new();
    for arg in args {
        if arg.contains(' ') && !arg.starts_with('"') {
            content.push('"');
            content.push_str(arg);
            content.push_str("\"\n");
        } else {
            content.push_str(arg);
            content.push('\n');
        }
    }

    std::fs::write(path, content).map_err(|source| BuildError::ResponseFileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Run a synthesized command in `cwd`, failing on a nonzero exit code.
///
/// The tool's standard error is passed through to ours.
pub fn execute(
    runner: &dyn CommandRunner,
    tool: &str,
    argv: &[String],
    cwd: &Path,
    new_environment: bool,
) -> BuildResult<RunOutput> {
    tracing::debug!("{}", argv.join(" "));

    let output = runner.run(argv, Some(cwd), new_environment)?;
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
    }
    if !output.success() {
        return Err(BuildError::ToolFailed {
            tool: tool.to_string(),
            code: output.code,
            location: cwd.to_path_buf(),
        });
    }
    Ok(output)
}
