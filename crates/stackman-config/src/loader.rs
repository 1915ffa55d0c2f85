//! Layered YAML configuration.
//!
//! # Design
//! - The embedded default document is always loaded first; a user file, when
//!   given, is deep-merged over it.
//! - Mappings merge key by key; any other user value (scalar, sequence, null)
//!   replaces the default outright.
//! - Keys are addressed with dotted paths such as `apache.vhosts_dir`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::defaults::{DEFAULT_CONFIG_YAML, DEFAULT_ORIGIN};
use crate::error::{ConfigError, ConfigResult};

/// Merged configuration document.
#[derive(Debug, Clone)]
pub struct StackConfig {
    root: Value,
    user_file: Option<PathBuf>,
}

impl StackConfig {
    /// Load the defaults and merge `user_file` over them when provided.
    ///
    /// # Errors
    ///
    /// Returns an error when the user file cannot be read or either document
    /// is not a YAML mapping.
    pub fn load(user_file: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::defaults()?;
        if let Some(path) = user_file {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            config.merge_yaml(&path.display().to_string(), &content)?;
            config.user_file = Some(path.to_path_buf());
            info!(path = %path.display(), "user configuration merged");
        }
        Ok(config)
    }

    /// Configuration consisting of the embedded defaults only.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded document is malformed.
    pub fn defaults() -> ConfigResult<Self> {
        Ok(Self {
            root: parse_document(DEFAULT_ORIGIN, DEFAULT_CONFIG_YAML)?,
            user_file: None,
        })
    }

    /// Deep-merge a YAML document over the current values.
    ///
    /// # Errors
    ///
    /// Returns an error when `content` is not YAML or its root is not a
    /// mapping.
    pub fn merge_yaml(&mut self, origin: &str, content: &str) -> ConfigResult<()> {
        let overlay = parse_document(origin, content)?;
        merge(&mut self.root, overlay);
        debug!(origin, "configuration document merged");
        Ok(())
    }

    /// User file merged into this configuration, if any.
    #[must_use]
    pub fn user_file(&self) -> Option<&Path> {
        self.user_file.as_deref()
    }

    /// Look up a dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.root, |node, segment| node.get(segment))
            .filter(|value| !value.is_null())
    }

    /// Deserialize the value at `key`, or return `default` when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the key exists with an
    /// incompatible shape.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> ConfigResult<T> {
        self.get(key).map_or(Ok(default), |value| {
            serde_yaml::from_value(value.clone()).map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
        })
    }

    /// String value at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or not a string.
    pub fn get_str(&self, key: &str) -> ConfigResult<&str> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| invalid(key, "string"))
    }

    /// Boolean value at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or not a boolean.
    pub fn get_bool(&self, key: &str) -> ConfigResult<bool> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| invalid(key, "boolean"))
    }

    /// Unsigned integer value at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or not a non-negative integer.
    pub fn get_u64(&self, key: &str) -> ConfigResult<u64> {
        self.require(key)?
            .as_u64()
            .ok_or_else(|| invalid(key, "unsigned integer"))
    }

    /// Sequence of strings at `key`. Numeric items are rendered as text so
    /// unquoted versions such as `8.4` are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing, not a sequence, or holds
    /// non-scalar items.
    pub fn get_string_list(&self, key: &str) -> ConfigResult<Vec<String>> {
        let items = self
            .require(key)?
            .as_sequence()
            .ok_or_else(|| invalid(key, "sequence of strings"))?;
        items
            .iter()
            .map(|item| scalar_text(item).ok_or_else(|| invalid(key, "sequence of strings")))
            .collect()
    }

    /// Filesystem path at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or not a string.
    pub fn get_path(&self, key: &str) -> ConfigResult<PathBuf> {
        self.get_str(key).map(PathBuf::from)
    }

    /// Scalar at `key` rendered as text (string, number, or boolean).
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or not a scalar.
    pub fn get_text(&self, key: &str) -> ConfigResult<String> {
        scalar_text(self.require(key)?).ok_or_else(|| invalid(key, "scalar"))
    }

    fn require(&self, key: &str) -> ConfigResult<&Value> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
    }
}

fn invalid(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        expected,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn parse_document(origin: &str, content: &str) -> ConfigResult<Value> {
    let value: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })?;
    match value {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        Value::Mapping(_) => Ok(value),
        _ => Err(ConfigError::InvalidRoot {
            origin: origin.to_string(),
        }),
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(user: &str) -> ConfigResult<StackConfig> {
        let mut config = StackConfig::defaults()?;
        config.merge_yaml("test.yml", user)?;
        Ok(config)
    }

    #[test]
    fn defaults_expose_dotted_keys() -> ConfigResult<()> {
        let config = StackConfig::defaults()?;
        assert_eq!(config.get_str("apache.vhosts_dir")?, "/etc/apache2/sites-available");
        assert_eq!(config.get_str("mysql.default_collation")?, "utf8mb4_unicode_ci");
        assert_eq!(config.get_u64("rollback.retention_days")?, 7);
        assert!(!config.get_bool("rollback.strict")?);
        assert_eq!(config.get_text("php.default_version")?, "8.4");
        Ok(())
    }

    #[test]
    fn user_mappings_merge_and_scalars_replace() -> ConfigResult<()> {
        let config = config(
            "apache:\n  vhosts_dir: /srv/vhosts\nphp:\n  supported_versions: [8.3]\nextra:\n  flag: true\n",
        )?;
        assert_eq!(config.get_str("apache.vhosts_dir")?, "/srv/vhosts");
        assert_eq!(config.get_str("apache.sites_dir")?, "/var/www");
        assert_eq!(config.get_string_list("php.supported_versions")?, vec!["8.3"]);
        assert!(config.get_bool("extra.flag")?);
        Ok(())
    }

    #[test]
    fn missing_keys_use_defaults_or_error() -> ConfigResult<()> {
        let config = config("{}")?;
        assert_eq!(config.get_or("non.existent.key", "fallback".to_string())?, "fallback");
        assert!(config.get("apache.vhosts_dir.deeper").is_none());
        assert!(matches!(
            config.get_str("nope"),
            Err(ConfigError::MissingKey { key }) if key == "nope"
        ));
        assert!(matches!(
            config.get_bool("apache.sites_dir"),
            Err(ConfigError::InvalidValue { expected: "boolean", .. })
        ));
        Ok(())
    }

    #[test]
    fn empty_document_is_accepted_and_non_mapping_is_rejected() -> ConfigResult<()> {
        assert!(config("").is_ok());
        assert!(matches!(
            config("- a\n- b\n"),
            Err(ConfigError::InvalidRoot { .. })
        ));
        assert!(matches!(
            config("apache: [unclosed"),
            Err(ConfigError::Parse { .. })
        ));
        Ok(())
    }

    #[test]
    fn explicit_null_hides_default() -> ConfigResult<()> {
        let config = config("audit:\n  dir: ~\n")?;
        assert!(config.get("audit.dir").is_none());
        Ok(())
    }
}
