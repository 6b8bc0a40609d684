//! # Design
//!
//! - Structured, constant-message errors for path confinement and tool execution.
//! - Rejection reasons are static strings so they can be logged without echoing input.
//! - Paths are kept in fields for logs only; HTTP surfaces never render them.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for filesystem and pipeline operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by the path guard and the conversion worker.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The requested path escapes, or cannot be confined to, the authorized root.
    #[error("path rejected")]
    PathRejected {
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// The confined path does not name an existing file.
    #[error("path not found")]
    PathMissing {
        /// Confined absolute path that was probed.
        path: PathBuf,
    },
    /// IO failure while inspecting or opening a confined path.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The conversion worker could not run or report a job.
    #[error("conversion worker unavailable")]
    WorkerUnavailable {
        /// Static reason for the failure.
        reason: &'static str,
    },
}

impl FsOpsError {
    pub(crate) const fn rejected(reason: &'static str) -> Self {
        Self::PathRejected { reason }
    }

    /// `true` for traversal attempts and symlink escapes.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::PathRejected { .. })
    }

    /// `true` when the confined path does not exist.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::PathMissing { .. })
    }
}

/// Failures launching or supervising an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started.
    #[error("failed to launch external tool")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Waiting for the program or collecting its output failed.
    #[error("failed to collect external tool output")]
    Wait {
        /// Program being awaited.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The program exceeded its time budget and was killed.
    #[error("external tool timed out")]
    TimedOut {
        /// Program that was killed.
        program: String,
        /// Budget that was exceeded.
        after: Duration,
    },
}

impl ToolError {
    /// Human-readable diagnostic used when the tool produced no output of its own.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Spawn { program, source } => format!("failed to launch {program}: {source}"),
            Self::Wait { program, source } => format!("failed to wait for {program}: {source}"),
            Self::TimedOut { program, after } => {
                format!("{program} timed out after {}s", after.as_secs())
            }
        }
    }
}
