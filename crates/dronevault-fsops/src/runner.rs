//! External tool invocation.
//!
//! The pipeline talks to tools through [`ToolRunner`] so tests can substitute
//! a recording fake; [`ProcessToolRunner`] is the production implementation.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ToolError;

/// One command line: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Program name or path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    /// Start an invocation with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a plain argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument without lossy conversion.
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Program followed by its arguments, lossily rendered for logs and assertions.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(
                self.args
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned()),
            )
            .collect()
    }
}

/// Captured result of a tool that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Whether the tool reported success.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// Successful run with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed run with the given exit code and stderr.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Diagnostic for a failed run: stderr, then stdout, then the exit status.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        self.code.map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exited with status {code}"),
        )
    }
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs external tools on behalf of the conversion pipeline.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit is reported as `Ok` with `success == false`; `Err` is
    /// reserved for launch failures and timeouts.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Spawns real child processes with a per-invocation timeout.
#[derive(Debug, Clone)]
pub struct ProcessToolRunner {
    timeout: Duration,
}

impl ProcessToolRunner {
    /// Runner that kills any child still running after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        debug!(argv = ?invocation.argv(), "spawning external tool");
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        // Dropping the pending future on timeout drops the child, which kills it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolOutput::from(output)),
            Ok(Err(source)) => Err(ToolError::Wait {
                program: invocation.program.clone(),
                source,
            }),
            Err(_) => Err(ToolError::TimedOut {
                program: invocation.program.clone(),
                after: self.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_prefers_stderr_then_stdout_then_status() {
        let mut output = ToolOutput::failed(3, "  bad header \n");
        output.stdout = "ignored".to_string();
        assert_eq!(output.diagnostic(), "bad header");

        output.stderr.clear();
        assert_eq!(output.diagnostic(), "ignored");

        output.stdout = "   ".to_string();
        assert_eq!(output.diagnostic(), "exited with status 3");

        output.code = None;
        assert_eq!(output.diagnostic(), "terminated by signal");
    }

    #[test]
    fn argv_renders_program_and_arguments() {
        let invocation = ToolInvocation::new("lasinfo")
            .arg("-i")
            .path_arg(Path::new("/data/site1/cloud.las"))
            .arg("-repair_bb");
        assert_eq!(
            invocation.argv(),
            vec!["lasinfo", "-i", "/data/site1/cloud.las", "-repair_bb"]
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let runner = ProcessToolRunner::new(Duration::from_secs(5));
        let result = runner
            .run(&ToolInvocation::new("dronevault-definitely-missing-tool"))
            .await;
        assert!(matches!(result, Err(ToolError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_captures_exit_status_and_streams() -> Result<(), ToolError> {
        let runner = ProcessToolRunner::new(Duration::from_secs(5));
        let output = runner
            .run(
                &ToolInvocation::new("sh")
                    .arg("-c")
                    .arg("echo converted; echo 'broken header' >&2; exit 4"),
            )
            .await?;
        assert!(!output.success);
        assert_eq!(output.code, Some(4));
        assert_eq!(output.stdout.trim(), "converted");
        assert_eq!(output.diagnostic(), "broken header");
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_kills_slow_tools() {
        let runner = ProcessToolRunner::new(Duration::from_millis(100));
        let result = runner
            .run(&ToolInvocation::new("sh").arg("-c").arg("sleep 5"))
            .await;
        assert!(matches!(result, Err(ToolError::TimedOut { .. })));
    }
}
