//! Append-only audit trail of administrative actions.
//!
//! # Design
//! - One JSON object per line in `{dir}/audit.log`.
//! - Audit failures are logged and swallowed; they never change the outcome
//!   of the action being recorded.
//! - A log whose directory cannot be prepared stays usable and simply drops
//!   entries after warning once.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, TelemetryError};

/// File name of the audit log inside its directory.
pub const AUDIT_FILE_NAME: &str = "audit.log";

/// One recorded action.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Action name, e.g. `create_site`.
    pub action: String,
    /// Object of the action, e.g. a site name.
    pub target: String,
    /// Operator that ran the command.
    pub user: String,
    /// Free-form structured detail.
    pub details: Value,
}

/// Writer for the audit trail.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: Option<PathBuf>,
    user: String,
}

impl AuditLog {
    /// Open the audit log under `dir`, creating the directory when needed.
    ///
    /// The returned log is always usable; when the directory cannot be created
    /// a warning is logged and entries are discarded.
    #[must_use]
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let path = match fs::create_dir_all(dir) {
            Ok(()) => Some(dir.join(AUDIT_FILE_NAME)),
            Err(source) => {
                let err = TelemetryError::AuditCreateDir {
                    path: dir.to_path_buf(),
                    source,
                };
                warn!(path = %dir.display(), error = %err, detail = ?err, "audit log unavailable");
                None
            }
        };
        Self {
            path,
            user: current_user(),
        }
    }

    /// Audit log that records nothing, used for dry runs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            path: None,
            user: current_user(),
        }
    }

    /// Override the operator recorded in each entry.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Path of the audit file, when the log is active.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry for `action` on `target`.
    pub fn record(&self, action: &str, target: &str, details: Value) {
        let Some(path) = &self.path else {
            debug!(action, target, "audit log disabled; entry dropped");
            return;
        };
        let entry = AuditEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            action: action.to_string(),
            target: target.to_string(),
            user: self.user.clone(),
            details,
        };
        if let Err(err) = append(path, &entry) {
            warn!(
                path = %path.display(),
                action,
                error = %err,
                detail = ?err,
                "failed to write audit entry"
            );
        }
    }
}

fn append(path: &Path, entry: &AuditEntry) -> Result<()> {
    let mut line =
        serde_json::to_string(entry).map_err(|source| TelemetryError::AuditSerialize { source })?;
    line.push('\n');
    let write_err = |source| TelemetryError::AuditWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(line.as_bytes()).map_err(write_err)
}

/// Operator name: `SUDO_USER`, else `USER`, else `unknown`.
#[must_use]
pub fn current_user() -> String {
    ["SUDO_USER", "USER"]
        .into_iter()
        .find_map(|key| env::var(key).ok().filter(|value| !value.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_log_has_no_path() {
        let log = AuditLog::disabled();
        assert!(log.path().is_none());
        log.record("switch_php", "example.org", Value::Null);
    }

    #[test]
    fn current_user_is_never_empty() {
        assert!(!current_user().is_empty());
    }
}
