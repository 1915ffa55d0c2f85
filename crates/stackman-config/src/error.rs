//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The user configuration file could not be read.
    #[error("failed to read configuration file")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A document was not valid YAML.
    #[error("failed to parse configuration")]
    Parse {
        /// File path or `<defaults>`.
        origin: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// A document parsed but its top level is not a mapping.
    #[error("configuration root must be a mapping")]
    InvalidRoot {
        /// File path or `<defaults>`.
        origin: String,
    },
    /// A required key is absent.
    #[error("missing configuration key")]
    MissingKey {
        /// Dotted key that was looked up.
        key: String,
    },
    /// A key holds a value of the wrong shape.
    #[error("invalid configuration value")]
    InvalidValue {
        /// Dotted key that was looked up.
        key: String,
        /// Expected shape.
        expected: &'static str,
    },
}
