//! Snapshot store: copies targets into a flat backup directory, copies them
//! back on rollback, and evicts artifacts past retention.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{RollbackError, RollbackResult};
use crate::model::{ArtifactInfo, EvictionSummary, OperationId, Snapshot, SnapshotKind};

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone)]
enum Readiness {
    Ready,
    Degraded(String),
}

/// Owner of the backup directory and every artifact beneath it.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    readiness: Readiness,
}

impl SnapshotStore {
    /// Open a store rooted at `root`, creating the directory when missing.
    ///
    /// A root that cannot be created does not fail construction: the store is
    /// returned in degraded mode (see [`Self::is_ready`]) and every snapshot
    /// attempt will fail on its own.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            root: root.into(),
            readiness: Readiness::Ready,
        };
        store.ensure_ready();
        store
    }

    /// Create the backup root (and parents) if absent. Returns whether the
    /// store is usable afterwards.
    pub fn ensure_ready(&mut self) -> bool {
        match fs::create_dir_all(&self.root) {
            Ok(()) => {
                self.readiness = Readiness::Ready;
                true
            }
            Err(err) => {
                warn!(
                    error = %err,
                    root = %self.root.display(),
                    "cannot create backup directory; protected operations will run without rollback"
                );
                self.readiness = Readiness::Degraded(err.to_string());
                false
            }
        }
    }

    /// Whether the backup root was prepared successfully.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready)
    }

    /// Reason the store is degraded, if it is.
    #[must_use]
    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.readiness {
            Readiness::Ready => None,
            Readiness::Degraded(reason) => Some(reason),
        }
    }

    /// Backup root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `path` into the store.
    ///
    /// Returns `None` when `path` does not exist (nothing is written) or when
    /// the copy fails; failures are logged and any partial artifact is removed.
    /// A symlink to a directory is recorded by its resolved target, so a
    /// restore rewrites the target and leaves the link in place.
    #[must_use]
    pub fn snapshot(&self, operation_id: &OperationId, path: &Path) -> Option<Snapshot> {
        if !path.exists() {
            debug!(path = %path.display(), "snapshot target absent; nothing to back up");
            return None;
        }

        let backup_path = self.artifact_path(operation_id, path);
        let kind = if path.is_dir() {
            SnapshotKind::Directory
        } else {
            SnapshotKind::File
        };
        let original = match kind {
            SnapshotKind::Directory => resolve_directory_link(path),
            SnapshotKind::File => path.to_path_buf(),
        };

        let copied = match kind {
            SnapshotKind::Directory => copy_tree(&original, &backup_path),
            SnapshotKind::File => copy_file_preserving(&original, &backup_path),
        };

        match copied {
            Ok(()) => {
                debug!(
                    original = %original.display(),
                    backup = %backup_path.display(),
                    "snapshot created"
                );
                Some(Snapshot {
                    operation_id: operation_id.to_string(),
                    original_path: original,
                    backup_path,
                    created_at: Utc::now(),
                    kind,
                })
            }
            Err(err) => {
                warn!(
                    error = %err,
                    detail = ?err,
                    path = %path.display(),
                    "could not create backup; target is unprotected for this operation"
                );
                discard_partial(&backup_path);
                None
            }
        }
    }

    /// Copy a snapshot back over its original path.
    ///
    /// Directories are replaced wholesale: the current tree is removed first,
    /// so a copy failure after the removal yields
    /// [`RollbackError::OriginalLost`] and a removal that stops partway yields
    /// [`RollbackError::OriginalDamaged`]. Files are overwritten in place and
    /// are never deleted first.
    ///
    /// # Errors
    ///
    /// Returns an error when the original cannot be removed or the backup
    /// cannot be copied back.
    pub fn restore(&self, snapshot: &Snapshot) -> RollbackResult<()> {
        let original = snapshot.original_path.as_path();
        let backup = snapshot.backup_path.as_path();

        if let Some(parent) = original.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| RollbackError::io("restore.create_parent", parent, source))?;
        }

        match snapshot.kind {
            SnapshotKind::File => copy_file_preserving(backup, original),
            SnapshotKind::Directory => {
                let removed = remove_existing(original, backup)?;
                copy_tree(backup, original).map_err(|err| {
                    if removed {
                        RollbackError::OriginalLost {
                            original: original.to_path_buf(),
                            backup: backup.to_path_buf(),
                            source: Box::new(err),
                        }
                    } else {
                        err
                    }
                })
            }
        }
    }

    /// Delete every artifact whose modification time is older than `days`.
    ///
    /// Problems with individual artifacts are logged and skipped.
    pub fn evict_older_than(&self, days: u64) -> EvictionSummary {
        let mut summary = EvictionSummary::default();
        let Some(cutoff) = days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| SystemTime::now().checked_sub(Duration::from_secs(secs)))
        else {
            return summary;
        };

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    error = %err,
                    root = %self.root.display(),
                    "could not list backup directory for cleanup"
                );
                return summary;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, root = %self.root.display(), "failed to read backup entry");
                    summary.failed += 1;
                    continue;
                }
            };
            summary.examined += 1;
            let path = entry.path();

            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "failed to stat backup artifact");
                    summary.failed += 1;
                    continue;
                }
            };
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "backup artifact has no mtime");
                    summary.failed += 1;
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            let removal = if metadata.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removal {
                Ok(()) => summary.removed += 1,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "failed to remove old backup");
                    summary.failed += 1;
                }
            }
        }

        if summary.removed > 0 {
            info!(
                removed = summary.removed,
                retention_days = days,
                "evicted expired backups"
            );
        }
        summary
    }

    /// List artifacts in the store, optionally limited to names starting with
    /// `prefix` (an operation name or full operation id).
    ///
    /// # Errors
    ///
    /// Returns an error when the backup directory cannot be read.
    pub fn list_artifacts(&self, prefix: Option<&str>) -> RollbackResult<Vec<ArtifactInfo>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| RollbackError::io("list.read_root", &self.root, source))?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|source| RollbackError::io("list.read_entry", &self.root, source))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if prefix.is_some_and(|prefix| !name.starts_with(prefix)) {
                continue;
            }
            let path = entry.path();
            let metadata = fs::symlink_metadata(&path)
                .map_err(|source| RollbackError::io("list.stat", &path, source))?;
            let modified = metadata
                .modified()
                .map_err(|source| RollbackError::io("list.mtime", &path, source))?;
            let size_bytes = if metadata.is_dir() {
                tree_size(&path)?
            } else {
                metadata.len()
            };
            artifacts.push(ArtifactInfo {
                name,
                path,
                modified: DateTime::<Utc>::from(modified),
                size_bytes,
                is_dir: metadata.is_dir(),
            });
        }
        artifacts.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(artifacts)
    }

    fn artifact_path(&self, operation_id: &OperationId, path: &Path) -> PathBuf {
        let base = format!("{operation_id}_{}", sanitize_leaf(path));
        let mut candidate = self.root.join(&base);
        let mut attempt = 1u32;
        while candidate.symlink_metadata().is_ok() {
            candidate = self.root.join(format!("{base}.{attempt}"));
            attempt += 1;
        }
        candidate
    }
}

/// Final path segment with separators flattened so the artifact name stays a
/// single directory entry.
pub(crate) fn sanitize_leaf(path: &Path) -> String {
    let leaf = path.file_name().unwrap_or_else(|| path.as_os_str());
    leaf.to_string_lossy()
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { '_' } else { ch })
        .collect()
}

fn remove_existing(path: &Path, backup: &Path) -> RollbackResult<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => return Err(RollbackError::io("restore.stat_original", path, source)),
    };
    if metadata.is_dir() {
        // remove_dir_all gives no indication of how far it got.
        fs::remove_dir_all(path).map_err(|source| RollbackError::OriginalDamaged {
            original: path.to_path_buf(),
            backup: backup.to_path_buf(),
            source,
        })?;
    } else {
        fs::remove_file(path)
            .map_err(|source| RollbackError::io("restore.remove_original", path, source))?;
    }
    Ok(true)
}

fn resolve_directory_link(path: &Path) -> PathBuf {
    let is_link =
        fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_symlink());
    if !is_link {
        return path.to_path_buf();
    }
    match fs::canonicalize(path) {
        Ok(resolved) => {
            debug!(
                link = %path.display(),
                target = %resolved.display(),
                "snapshot target is a symlinked directory; backing up its target"
            );
            resolved
        }
        Err(err) => {
            warn!(error = %err, path = %path.display(), "could not resolve symlinked directory");
            path.to_path_buf()
        }
    }
}

fn discard_partial(path: &Path) {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    let removal = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(err) = removal {
        warn!(error = %err, path = %path.display(), "failed to discard partial backup");
    }
}

fn copy_file_preserving(source: &Path, destination: &Path) -> RollbackResult<()> {
    fs::copy(source, destination)
        .map_err(|err| RollbackError::io("copy.file", destination, err))?;
    let modified = fs::metadata(source)
        .and_then(|metadata| metadata.modified())
        .map_err(|err| RollbackError::io("copy.read_mtime", source, err))?;
    File::open(destination)
        .and_then(|file| file.set_modified(modified))
        .map_err(|err| RollbackError::io("copy.set_mtime", destination, err))
}

fn copy_tree(source: &Path, destination: &Path) -> RollbackResult<()> {
    let mut directories = Vec::new();

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|err| RollbackError::walkdir("copy.walk", source, err))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| {
                RollbackError::io(
                    "copy.strip_prefix",
                    entry.path(),
                    io::Error::other("entry outside copy root"),
                )
            })?;
        let target_path = destination.join(relative);
        let file_type = entry.file_type();

        // The root is followed even when it is a link to a directory.
        if entry.depth() == 0 || file_type.is_dir() {
            fs::create_dir(&target_path)
                .map_err(|err| RollbackError::io("copy.create_dir", &target_path, err))?;
            directories.push((entry.path().to_path_buf(), target_path));
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target_path)?;
        } else {
            copy_file_preserving(entry.path(), &target_path)?;
        }
    }

    // Deepest first, so stamping a child does not disturb its parent's mtime.
    for (source_dir, target_dir) in directories.iter().rev() {
        copy_directory_metadata(source_dir, target_dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> RollbackResult<()> {
    let target =
        fs::read_link(source).map_err(|err| RollbackError::io("copy.read_link", source, err))?;
    std::os::unix::fs::symlink(&target, destination)
        .map_err(|err| RollbackError::io("copy.symlink", destination, err))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> RollbackResult<()> {
    copy_file_preserving(source, destination)
}

fn copy_directory_metadata(source: &Path, destination: &Path) -> RollbackResult<()> {
    let metadata =
        fs::metadata(source).map_err(|err| RollbackError::io("copy.stat_dir", source, err))?;
    #[cfg(unix)]
    {
        let modified = metadata
            .modified()
            .map_err(|err| RollbackError::io("copy.read_mtime", source, err))?;
        File::open(destination)
            .and_then(|dir| dir.set_modified(modified))
            .map_err(|err| RollbackError::io("copy.set_dir_mtime", destination, err))?;
    }
    fs::set_permissions(destination, metadata.permissions())
        .map_err(|err| RollbackError::io("copy.set_dir_permissions", destination, err))
}

fn tree_size(root: &Path) -> RollbackResult<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| RollbackError::walkdir("list.walk", root, err))?;
        if entry.file_type().is_file() {
            let metadata = entry
                .metadata()
                .map_err(|err| RollbackError::walkdir("list.walk", root, err))?;
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(total)
}
