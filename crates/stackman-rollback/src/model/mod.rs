//! Records produced by the snapshot store and the controller.
//!
//! # Design
//! - Snapshots live only in memory for the duration of one protected call.
//! - Nothing here is persisted; the store's directory listing is the only index.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::error::RollbackError;

/// Timestamp layout embedded in operation identifiers.
pub const OPERATION_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Identifier of one protected invocation: `{name}_{YYYYMMDD_HHMMSS}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId(String);

impl OperationId {
    /// Build the identifier for `name` started at `at`.
    #[must_use]
    pub fn new(name: &str, at: DateTime<Local>) -> Self {
        Self(format!("{name}_{}", at.format(OPERATION_TIMESTAMP_FORMAT)))
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OperationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Shape of a backed-up path, captured when the snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// Regular file (or a symlink resolving to one).
    File,
    /// Directory tree.
    Directory,
}

/// One backed-up filesystem entry.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Invocation that produced the snapshot.
    pub operation_id: String,
    /// Path that was copied.
    pub original_path: PathBuf,
    /// Artifact inside the store holding the copy.
    pub backup_path: PathBuf,
    /// When the copy was made.
    pub created_at: DateTime<Utc>,
    /// Whether a file or a directory tree was copied.
    pub kind: SnapshotKind,
}

/// Counters returned by an eviction sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionSummary {
    /// Artifacts inspected.
    pub examined: usize,
    /// Artifacts deleted because they were past retention.
    pub removed: usize,
    /// Artifacts that could not be inspected or deleted.
    pub failed: usize,
}

/// A restore that did not succeed during rollback.
#[derive(Debug)]
pub struct RestoreFailure {
    /// Path that should have been restored.
    pub original: PathBuf,
    /// Artifact that was being copied back.
    pub backup: PathBuf,
    /// Why the restore failed.
    pub error: RollbackError,
}

/// Result of restoring every snapshot after failed work.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Paths restored, in restore order.
    pub restored: Vec<PathBuf>,
    /// Restores that failed, in restore order.
    pub failed: Vec<RestoreFailure>,
}

impl RollbackReport {
    /// Every snapshot was restored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// At least one restore left the filesystem needing manual repair.
    #[must_use]
    pub fn requires_manual_intervention(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Whether `path` was restored.
    #[must_use]
    pub fn was_restored(&self, path: &Path) -> bool {
        self.restored.iter().any(|restored| restored == path)
    }
}

/// An artifact found in the store directory.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    /// File name inside the store.
    pub name: String,
    /// Full path of the artifact.
    pub path: PathBuf,
    /// Last modification time used by eviction.
    pub modified: DateTime<Utc>,
    /// Total size in bytes (recursive for directories).
    pub size_bytes: u64,
    /// Whether the artifact is a directory copy.
    pub is_dir: bool,
}
