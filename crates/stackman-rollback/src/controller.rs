//! Protected-operation controller.
//!
//! # Design
//! - Snapshot every target, run the work, then either evict old artifacts
//!   (success) or restore every snapshot in creation order (failure).
//! - The work's own error is always the one handed back to the caller.
//! - Backup problems are side-channel: logged, reported, never promoted to the
//!   operation outcome (except in strict mode, before any work runs).

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::ProtectedError;
use crate::model::{OperationId, RestoreFailure, RollbackReport, Snapshot};
use crate::store::SnapshotStore;

/// Retention applied after a successful operation unless configured otherwise.
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// How the controller behaves when the backup root is unusable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProtectionMode {
    /// Log the condition and run the work without rollback capability.
    #[default]
    Degrade,
    /// Refuse to run the work at all.
    Strict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Snapshotting,
    Executing,
    Committing,
    RollingBack,
    Done,
}

impl Phase {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Snapshotting => "snapshotting",
            Self::Executing => "executing",
            Self::Committing => "committing",
            Self::RollingBack => "rolling_back",
            Self::Done => "done",
        }
    }
}

/// Wraps filesystem-mutating work with snapshot and rollback.
#[derive(Clone)]
pub struct ProtectedOperations {
    store: SnapshotStore,
    mode: ProtectionMode,
    retention_days: u64,
    clock: Arc<dyn Clock>,
}

impl ProtectedOperations {
    /// Controller over `store` with degrade-on-failure protection and the
    /// default seven-day retention.
    #[must_use]
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store,
            mode: ProtectionMode::default(),
            retention_days: DEFAULT_RETENTION_DAYS,
            clock: Arc::new(SystemClock),
        }
    }

    /// Select the behaviour for an unusable backup root.
    #[must_use]
    pub fn with_mode(mut self, mode: ProtectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the retention window used after successful work.
    #[must_use]
    pub fn with_retention_days(mut self, days: u64) -> Self {
        self.retention_days = days;
        self
    }

    /// Replace the time source used for operation identifiers.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot store backing this controller.
    #[must_use]
    pub const fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Whether operations currently run with rollback capability.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        self.store.is_ready()
    }

    /// Configured protection mode.
    #[must_use]
    pub const fn mode(&self) -> ProtectionMode {
        self.mode
    }

    /// Configured retention window in days.
    #[must_use]
    pub const fn retention_days(&self) -> u64 {
        self.retention_days
    }

    /// Run `work` after snapshotting every path in `targets`.
    ///
    /// Targets are snapshotted in order; absent targets and targets that
    /// cannot be copied are left unprotected. On success, artifacts older
    /// than the retention window are evicted. On failure, every snapshot is
    /// restored in creation order, even after an earlier restore failed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectedError::Failed`] carrying the work's own error when
    /// the work fails, or [`ProtectedError::BackupUnavailable`] when strict
    /// mode is enabled and the backup root is unusable.
    pub fn run_protected<T, E, F, I, P>(
        &self,
        name: &str,
        targets: I,
        work: F,
    ) -> Result<T, ProtectedError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: Display,
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let operation_id = OperationId::new(name, self.clock.now());

        if !self.store.is_ready() {
            if self.mode == ProtectionMode::Strict {
                error!(
                    operation = %operation_id,
                    root = %self.store.root().display(),
                    "backup store unavailable; refusing to run in strict mode"
                );
                return Err(ProtectedError::BackupUnavailable {
                    operation: name.to_string(),
                    root: self.store.root().to_path_buf(),
                });
            }
            warn!(
                operation = %operation_id,
                root = %self.store.root().display(),
                "backup store unavailable; running without rollback"
            );
        }

        self.enter(&operation_id, Phase::Snapshotting);
        let snapshots: Vec<Snapshot> = targets
            .into_iter()
            .filter_map(|target| self.store.snapshot(&operation_id, target.as_ref()))
            .collect();
        debug!(
            operation = %operation_id,
            snapshots = snapshots.len(),
            "pre-operation snapshots taken"
        );

        self.enter(&operation_id, Phase::Executing);
        let outcome = work();

        match outcome {
            Ok(value) => {
                self.enter(&operation_id, Phase::Committing);
                let summary = self.store.evict_older_than(self.retention_days);
                if summary.failed > 0 {
                    warn!(
                        operation = %operation_id,
                        failed = summary.failed,
                        "some expired backups could not be removed"
                    );
                }
                self.enter(&operation_id, Phase::Done);
                Ok(value)
            }
            Err(source) => {
                error!(operation = %operation_id, error = %source, "operation failed");
                self.enter(&operation_id, Phase::RollingBack);
                let rollback = self.roll_back(&operation_id, &snapshots);
                self.enter(&operation_id, Phase::Done);
                Err(ProtectedError::Failed {
                    operation_id: operation_id.to_string(),
                    source,
                    rollback,
                })
            }
        }
    }

    fn roll_back(&self, operation_id: &OperationId, snapshots: &[Snapshot]) -> RollbackReport {
        let mut report = RollbackReport::default();
        if snapshots.is_empty() {
            info!(operation = %operation_id, "nothing to roll back");
            return report;
        }

        info!(
            operation = %operation_id,
            snapshots = snapshots.len(),
            "executing rollback"
        );
        for snapshot in snapshots {
            match self.store.restore(snapshot) {
                Ok(()) => {
                    info!(
                        operation = %operation_id,
                        path = %snapshot.original_path.display(),
                        "restored"
                    );
                    report.restored.push(snapshot.original_path.clone());
                }
                Err(err) => {
                    error!(
                        operation = %operation_id,
                        original = %snapshot.original_path.display(),
                        backup = %snapshot.backup_path.display(),
                        error = %err,
                        detail = ?err,
                        original_lost = err.requires_manual_intervention(),
                        "FATAL: could not restore backup; manual intervention required"
                    );
                    report.failed.push(RestoreFailure {
                        original: snapshot.original_path.clone(),
                        backup: snapshot.backup_path.clone(),
                        error: err,
                    });
                }
            }
        }
        report
    }

    fn enter(&self, operation_id: &OperationId, phase: Phase) {
        debug!(
            operation = %operation_id,
            phase = phase.as_str(),
            protected = self.store.is_ready(),
            "protected operation phase"
        );
    }
}
