//! Container runtime command abstraction.
//!
//! Every interaction with the external runtime goes through a [`CommandRunner`].
//! A runner executes one [`DockerCommand`] to completion and hands back a
//! [`CommandOutput`] holding both captured streams. A failed command is an
//! ordinary return value; nothing here raises on a non-zero exit.

use crate::error::{DockError, Result};
use duct::cmd;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info};
use which::which;

/// Builder for runtime commands with a fluent interface.
///
/// The builder only carries the subcommand and its arguments; the executable
/// is supplied by the runner, so the same command can be replayed against a
/// scripted runner in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerCommand {
    subcommand: Option<String>,
    args: Vec<String>,
}

impl DockerCommand {
    /// Create a new command builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subcommand (e.g., "ps", "stats", "network").
    pub fn subcommand<S: Into<String>>(mut self, cmd: S) -> Self {
        self.subcommand = Some(cmd.into());
        self
    }

    /// Add a single argument to the command.
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argument vector, subcommand first.
    pub fn argv(&self) -> Vec<String> {
        self.subcommand
            .iter()
            .cloned()
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Render as a single command line for logs and error reports.
    pub fn render(&self, program: &str) -> String {
        std::iter::once(program.to_string())
            .chain(self.argv().into_iter().map(|a| quote_if_needed(&a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for DockerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("docker"))
    }
}

fn quote_if_needed(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Rendered command line, kept for audit and error reporting.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// False on non-zero exit or launch failure.
    pub ok: bool,
    /// Exit code, when the process ran at all.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(command: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: String::new(),
            ok: true,
            code: Some(0),
        }
    }

    pub fn failure(command: impl Into<String>, stderr: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            command: command.into(),
            stdout: String::new(),
            stderr: stderr.into(),
            ok: false,
            code,
        }
    }

    /// Non-empty stdout lines.
    pub fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    /// Turn a failed output into a [`DockError::CommandFailed`].
    pub fn into_result(self) -> Result<CommandOutput> {
        if self.ok {
            Ok(self)
        } else {
            Err(self.to_error())
        }
    }

    pub fn to_error(&self) -> DockError {
        DockError::command_failed(self.command.clone(), self.stderr.clone(), self.code)
    }
}

/// Executes runtime commands synchronously on the calling thread.
///
/// Callers run this off any interactive thread; the engine wraps calls in
/// `tokio::task::spawn_blocking`.
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion and capture both output streams.
    fn run(&self, command: &DockerCommand) -> CommandOutput;

    /// Name of the executable, used when rendering command lines.
    fn program(&self) -> &str {
        "docker"
    }
}

/// Runner backed by the real `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Checks if the configured binary is available in the system's PATH.
    pub fn is_installed(&self) -> bool {
        which(&self.binary).is_ok()
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl CommandRunner for DockerCli {
    fn run(&self, command: &DockerCommand) -> CommandOutput {
        let rendered = command.render(&self.binary);
        debug!(command = %rendered, "Executing command");

        let result = cmd(&self.binary, command.argv())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run();

        match result {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let ok = output.status.success();
                if ok {
                    info!(command = %rendered, "Command succeeded");
                } else {
                    error!(
                        command = %rendered,
                        code = ?output.status.code(),
                        "Command failed: {}",
                        stderr.trim()
                    );
                }
                CommandOutput {
                    command: rendered,
                    stdout,
                    stderr,
                    ok,
                    code: output.status.code(),
                }
            }
            Err(e) => {
                error!(command = %rendered, "Failed to launch command: {}", e);
                CommandOutput::failure(rendered, format!("Failed to launch '{}': {}", self.binary, e), None)
            }
        }
    }

    fn program(&self) -> &str {
        &self.binary
    }
}
