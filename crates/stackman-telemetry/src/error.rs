//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// Creating the audit directory failed.
    AuditCreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Appending to the audit file failed.
    AuditWrite {
        /// Audit file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Serialising an audit entry failed.
    AuditSerialize {
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::AuditCreateDir { .. } => formatter.write_str("failed to create audit directory"),
            Self::AuditWrite { .. } => formatter.write_str("failed to append audit entry"),
            Self::AuditSerialize { .. } => formatter.write_str("failed to serialize audit entry"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::AuditCreateDir { source, .. } | Self::AuditWrite { source, .. } => Some(source),
            Self::AuditSerialize { source } => Some(source),
        }
    }
}
