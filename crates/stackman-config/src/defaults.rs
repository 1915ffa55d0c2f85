//! Built-in configuration values.

/// Default configuration document compiled into the binary.
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../config/default.yml");

/// Environment variable naming a user configuration file.
pub const CONFIG_ENV: &str = "STACKMAN_CONFIG";

/// Label used for the embedded document in errors.
pub(crate) const DEFAULT_ORIGIN: &str = "<defaults>";
