//! # Design
//!
//! - Constant messages with the offending program, unit, or path as fields.
//! - A missing executable (`Spawn` with `NotFound`) stays distinguishable from
//!   a command that ran and failed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors produced while talking to the host system.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The program could not be started.
    #[error("failed to spawn command")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The program ran and exited unsuccessfully.
    #[error("command exited unsuccessfully")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, when the process was not killed by a signal.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// `/etc/os-release` could not be read.
    #[error("failed to read os-release")]
    OsRelease {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The distribution has no supported package manager.
    #[error("unsupported distribution")]
    UnsupportedDistribution {
        /// `ID` value from os-release.
        id: String,
    },
    /// A service action name was not recognised.
    #[error("invalid service action")]
    InvalidServiceAction {
        /// Action provided by the caller.
        action: String,
    },
}

impl PlatformError {
    /// Whether the failure was a missing executable.
    #[must_use]
    pub fn is_missing_program(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
