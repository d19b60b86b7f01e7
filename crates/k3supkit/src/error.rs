//! Error types for k3sup orchestration.
//!
//! Errors are grouped into categories so callers can tell a bad
//! configuration (nothing was touched) apart from a failed remote run
//! (the target may be half-configured).

use crate::types::Action;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of orchestration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing configuration. No remote interaction happened.
    Validation,
    /// The installer process could not be started at all.
    Execution,
    /// The mutating install/join run exited nonzero.
    RemoteFailure,
    /// The installer run was killed after exceeding its deadline.
    Cancelled,
}

impl ErrorCategory {
    /// Whether the remote host may have been contacted before the error.
    pub fn touched_remote(&self) -> bool {
        matches!(self, Self::RemoteFailure | Self::Cancelled)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid configuration",
            Self::Execution => "Installer could not be started",
            Self::RemoteFailure => "Installation failed on the target",
            Self::Cancelled => "Installer run timed out",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the configuration values and run again",
            Self::Execution => "Check that the k3sup binary exists and is executable",
            Self::RemoteFailure => "Inspect the captured stderr; the target may need manual cleanup",
            Self::Cancelled => "Check SSH connectivity to the target or raise the timeout",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while planning or running k3sup.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is missing or malformed.
    #[error("invalid configuration: {message}")]
    Validation {
        /// What is wrong with the configuration
        message: String,
    },

    /// The installer binary does not exist.
    #[error("k3sup binary not found at {}", .0.display())]
    InstallerNotFound(PathBuf),

    /// The installer path exists but cannot be executed.
    #[error("k3sup binary at {} is not an executable file", .0.display())]
    InstallerNotExecutable(PathBuf),

    /// The installer process could not be spawned.
    #[error("failed to execute {}: {source}", .program.display())]
    Spawn {
        /// Program that failed to start
        program: PathBuf,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },

    /// The installer run exceeded its deadline and was killed.
    #[error("{} did not finish within {}s and was terminated", .program.display(), .timeout.as_secs())]
    Cancelled {
        /// Program that was terminated
        program: PathBuf,
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// The mutating install/join run exited nonzero.
    #[error("failed to {verb} {action} node at {ip} (exit code {exit_code}): {}", .stderr.trim())]
    RemoteFailure {
        /// Role that was being configured
        action: Action,
        /// k3sup sub-command that was run
        verb: &'static str,
        /// Target host
        ip: String,
        /// Exit code of the run
        exit_code: i32,
        /// Captured standard output, kept for diagnostics
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// IO error while supervising the installer process.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation { .. }
            | Error::InstallerNotFound(_)
            | Error::InstallerNotExecutable(_) => ErrorCategory::Validation,
            Error::Spawn { .. } | Error::Io(_) => ErrorCategory::Execution,
            Error::RemoteFailure { .. } => ErrorCategory::RemoteFailure,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Whether this error was raised before anything ran against the target.
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}
