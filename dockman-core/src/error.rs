//! Error types shared by every DockMan crate.
//!
//! Failures of the external runtime are values, not panics: a refresh or an
//! operation step reports a [`DockError::CommandFailed`] and the caller decides
//! what to do with it.

use crate::kind::ResourceKind;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Primary error type for inventory and operation failures.
#[derive(Error, Debug)]
pub enum DockError {
    /// Non-zero exit or launch failure of an external runtime command.
    #[error("Command failed: {command}{}", format_stderr(.stderr))]
    CommandFailed {
        command: String,
        stderr: String,
        code: Option<i32>,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({})", trimmed)
    }
}

impl DockError {
    /// Build a `CommandFailed` from a rendered command line and its captured stderr.
    pub fn command_failed(command: impl Into<String>, stderr: impl Into<String>, code: Option<i32>) -> Self {
        DockError::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
            code,
        }
    }

    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        DockError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for errors detected before any external command ran.
    pub fn is_precondition(&self) -> bool {
        matches!(self, DockError::Validation(_) | DockError::NotFound { .. })
    }

    /// Convert the error to an operator-facing message with a hint.
    pub fn user_friendly(&self) -> String {
        match self {
            Self::CommandFailed { stderr, .. }
                if stderr.contains("Cannot connect to the Docker daemon")
                    || stderr.contains("connection refused") =>
            {
                format!("{}\n💡 Is the Docker daemon running? Try: docker info", self)
            }
            Self::CommandFailed { stderr, .. } if stderr.contains("command not found") => {
                format!("{}\n💡 Install Docker or set DOCKMAN_DOCKER_BIN", self)
            }
            Self::CommandFailed { stderr, .. } if stderr.contains("permission denied") => {
                format!(
                    "{}\n💡 Add your user to the docker group: sudo usermod -aG docker $USER",
                    self
                )
            }
            Self::NotFound { .. } => format!("{}\n💡 Refresh the inventory: dockman list", self),
            Self::Validation(ValidationError::NameConflict { .. }) => {
                format!("{}\n💡 Choose a different name", self)
            }
            _ => self.to_string(),
        }
    }
}

impl From<serde_yaml_ng::Error> for DockError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        DockError::Serialization(err.to_string())
    }
}

/// Input rejected before any external command is issued.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationError {
    #[error("invalid {kind} identifier '{id}' (expected 12 or more alphanumeric characters)")]
    InvalidIdentifier { kind: ResourceKind, id: String },

    #[error("{field} cannot be empty")]
    EmptyName { field: &'static str },

    #[error("a {kind} named '{name}' already exists")]
    NameConflict { kind: ResourceKind, name: String },

    #[error("destination '{path}' is not writable: {reason}")]
    UnwritableDestination { path: String, reason: String },

    #[error("invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },
}

/// A malformed listing line. Collected alongside parsed records, never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub kind: ResourceKind,
    /// 1-based line number within the listing output.
    pub line_number: usize,
    pub line: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(kind: ResourceKind, line_number: usize, line: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            line_number,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listing line {}: {} ({:?})",
            self.kind, self.line_number, self.reason, self.line
        )
    }
}

impl std::error::Error for ParseError {}

pub type Result<T> = std::result::Result<T, DockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_includes_stderr() {
        let err = DockError::command_failed("docker stop abc123def456", "No such container\n", Some(1));
        assert_eq!(
            err.to_string(),
            "Command failed: docker stop abc123def456 (No such container)"
        );

        let quiet = DockError::command_failed("docker info", "", Some(1));
        assert_eq!(quiet.to_string(), "Command failed: docker info");
    }

    #[test]
    fn test_user_friendly_daemon_hint() {
        let err = DockError::command_failed(
            "docker ps -a",
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock",
            Some(1),
        );
        assert!(err.user_friendly().contains("Is the Docker daemon running?"));
    }

    #[test]
    fn test_precondition_classification() {
        let validation: DockError = ValidationError::EmptyName { field: "image name" }.into();
        assert!(validation.is_precondition());
        assert!(DockError::not_found(ResourceKind::Image, "abc123def456").is_precondition());
        assert!(!DockError::Internal("boom".into()).is_precondition());
    }
}
