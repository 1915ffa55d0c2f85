//! # Design
//!
//! - Constant error messages; paths and operation names travel as fields.
//! - `OriginalLost` and `OriginalDamaged` are kept separate from plain IO
//!   failures: they are the outcomes that cannot be recovered automatically.
//! - `ProtectedError` carries the caller's own error untouched.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::RollbackReport;

/// Result type for snapshot store operations.
pub type RollbackResult<T> = Result<T, RollbackError>;

/// Errors produced by the snapshot store.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// IO failures while copying, removing, or inspecting paths.
    #[error("rollback io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures.
    #[error("rollback walkdir failure")]
    Walkdir {
        /// Operation that triggered the traversal failure.
        operation: &'static str,
        /// Root of the traversal.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The original directory was removed but the backup could not be copied
    /// back. The original path is now missing and needs manual recovery.
    #[error("original removed and backup could not be copied back")]
    OriginalLost {
        /// Path that no longer exists.
        original: PathBuf,
        /// Artifact still holding the pre-operation content.
        backup: PathBuf,
        /// Failure raised by the copy.
        source: Box<RollbackError>,
    },
    /// Removing the original directory stopped partway, so part of the tree
    /// may already be gone and the backup was not copied back.
    #[error("original partially removed before restore")]
    OriginalDamaged {
        /// Directory left in an unknown state.
        original: PathBuf,
        /// Artifact still holding the pre-operation content.
        backup: PathBuf,
        /// Failure raised by the removal.
        source: io::Error,
    },
}

impl RollbackError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether an operator has to repair the filesystem by hand.
    #[must_use]
    pub const fn requires_manual_intervention(&self) -> bool {
        matches!(
            self,
            Self::OriginalLost { .. } | Self::OriginalDamaged { .. }
        )
    }
}

/// Outcome of a failed [`crate::ProtectedOperations::run_protected`] call.
#[derive(Debug, Error)]
pub enum ProtectedError<E> {
    /// Strict mode refused to run because the backup root is unusable.
    #[error("backup store unavailable")]
    BackupUnavailable {
        /// Name of the refused operation.
        operation: String,
        /// Backup root that could not be prepared.
        root: PathBuf,
    },
    /// The work failed; rollback was attempted before this was returned.
    #[error("protected operation failed")]
    Failed {
        /// Identifier of the failed invocation.
        operation_id: String,
        /// The error returned by the work itself.
        source: E,
        /// What the rollback managed to restore.
        rollback: RollbackReport,
    },
}

impl<E> ProtectedError<E> {
    /// The triggering error, when the work ran and failed.
    #[must_use]
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::BackupUnavailable { .. } => None,
        }
    }

    /// Borrow the triggering error, when the work ran and failed.
    #[must_use]
    pub const fn work_error(&self) -> Option<&E> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::BackupUnavailable { .. } => None,
        }
    }

    /// Rollback report for failed work.
    #[must_use]
    pub const fn rollback(&self) -> Option<&RollbackReport> {
        match self {
            Self::Failed { rollback, .. } => Some(rollback),
            Self::BackupUnavailable { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn original_lost_is_flagged_for_manual_intervention() {
        let copy_err = RollbackError::io("restore.copy", "/srv/site", io::Error::other("disk"));
        assert!(!copy_err.requires_manual_intervention());
        let lost = RollbackError::OriginalLost {
            original: PathBuf::from("/srv/site"),
            backup: PathBuf::from("/backups/op_20240101_000000_site"),
            source: Box::new(copy_err),
        };
        assert!(lost.requires_manual_intervention());
        assert!(lost.source().is_some());
    }

    #[test]
    fn partial_removal_is_flagged_for_manual_intervention() {
        let damaged = RollbackError::OriginalDamaged {
            original: PathBuf::from("/srv/site"),
            backup: PathBuf::from("/backups/op_20240101_000000_site"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(damaged.requires_manual_intervention());
        assert_eq!(damaged.to_string(), "original partially removed before restore");
        assert!(damaged.source().is_some());
    }

    #[test]
    fn protected_error_exposes_work_error_only_when_work_ran() {
        let unavailable: ProtectedError<io::Error> = ProtectedError::BackupUnavailable {
            operation: "switch_php".into(),
            root: PathBuf::from("/nope"),
        };
        assert!(unavailable.work_error().is_none());
        assert!(unavailable.rollback().is_none());
        assert!(unavailable.into_source().is_none());

        let failed = ProtectedError::Failed {
            operation_id: "switch_php_20240101_000000".into(),
            source: io::Error::other("reload failed"),
            rollback: RollbackReport::default(),
        };
        assert!(failed.source().is_some());
        assert!(failed.rollback().is_some_and(RollbackReport::is_complete));
        let source = failed.into_source().map(|err| err.to_string());
        assert_eq!(source.as_deref(), Some("reload failed"));
    }
}
