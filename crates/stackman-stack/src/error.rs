//! # Design
//!
//! - Constant messages; the offending site, path, or command travels as a field.
//! - Validation problems are collected into one variant so operators see
//!   every issue at once.
//! - A failed protected operation keeps the work's own error as its source
//!   and carries the rollback report alongside.

use std::io;
use std::path::PathBuf;

use stackman_config::ConfigError;
use stackman_platform::PlatformError;
use stackman_rollback::{ProtectedError, RollbackError, RollbackReport};
use thiserror::Error;

/// Result type for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Errors produced by stack management.
#[derive(Debug, Error)]
pub enum StackError {
    /// Input or host checks failed; every problem is listed.
    #[error("validation failed")]
    Validation {
        /// Human-readable problems, in check order.
        errors: Vec<String>,
    },
    /// Configuration could not be read.
    #[error("configuration error")]
    Config {
        /// Underlying configuration error.
        #[from]
        source: ConfigError,
    },
    /// A host command failed.
    #[error("host command failed")]
    Platform {
        /// Step that ran the command.
        operation: &'static str,
        /// Underlying platform error.
        source: PlatformError,
    },
    /// Filesystem access failed.
    #[error("stack io failure")]
    Io {
        /// Step that touched the filesystem.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The site has no virtual host file.
    #[error("virtual host not found")]
    VhostNotFound {
        /// Requested site.
        site: String,
        /// Expected vhost path.
        path: PathBuf,
    },
    /// The virtual host has no PHP-FPM handler directive.
    #[error("php handler directive not found")]
    PhpHandlerNotFound {
        /// Vhost that was inspected.
        path: PathBuf,
    },
    /// The snapshot directory could not be read.
    #[error("snapshot store failure")]
    Snapshot {
        /// Underlying store error.
        #[from]
        source: RollbackError,
    },
    /// A built-in pattern failed to compile.
    #[error("failed to compile regex")]
    RegexCompile {
        /// Pattern that failed.
        pattern: &'static str,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// Strict mode refused to mutate without a usable backup directory.
    #[error("backup directory unavailable")]
    BackupUnavailable {
        /// Operation that was refused.
        operation: String,
        /// Backup directory that could not be prepared.
        root: PathBuf,
    },
    /// The operation failed and its snapshots were restored.
    #[error("operation failed and was rolled back")]
    RolledBack {
        /// Identifier of the failed invocation.
        operation_id: String,
        /// What went wrong.
        source: Box<StackError>,
        /// What the rollback restored.
        report: RollbackReport,
    },
}

impl StackError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn platform(operation: &'static str) -> impl FnOnce(PlatformError) -> Self {
        move |source| Self::Platform { operation, source }
    }

    /// Whether the failure left the filesystem needing manual repair.
    #[must_use]
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(self, Self::RolledBack { report, .. } if report.requires_manual_intervention())
    }

    /// Validation messages, when this is a validation failure.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&[String]> {
        match self {
            Self::Validation { errors } => Some(errors),
            _ => None,
        }
    }
}

impl From<ProtectedError<StackError>> for StackError {
    fn from(err: ProtectedError<StackError>) -> Self {
        match err {
            ProtectedError::BackupUnavailable { operation, root } => {
                Self::BackupUnavailable { operation, root }
            }
            ProtectedError::Failed {
                operation_id,
                source,
                rollback,
            } => Self::RolledBack {
                operation_id,
                source: Box::new(source),
                report: rollback,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn rolled_back_keeps_work_error_as_source() {
        let err = StackError::from(ProtectedError::Failed {
            operation_id: "switch_php_20240101_000000".into(),
            source: StackError::PhpHandlerNotFound {
                path: PathBuf::from("/etc/apache2/sites-available/a.conf"),
            },
            rollback: RollbackReport::default(),
        });
        assert!(matches!(err, StackError::RolledBack { .. }));
        assert!(!err.requires_manual_intervention());
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("php handler directive not found")
        );
    }

    #[test]
    fn validation_errors_are_exposed() {
        let err = StackError::Validation {
            errors: vec!["bad name".into()],
        };
        assert_eq!(err.validation_errors(), Some(&["bad name".to_string()][..]));
        let other = StackError::io("read", "/x", io::Error::other("x"));
        assert!(other.validation_errors().is_none());
    }
}
