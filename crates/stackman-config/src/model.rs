//! Typed views over the merged configuration.

use std::path::PathBuf;

use crate::error::ConfigResult;
use crate::loader::StackConfig;

/// Placeholder replaced by the PHP version in package names.
pub const PHP_VERSION_PLACEHOLDER: &str = "{version}";

/// Snapshot and retention settings for protected operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackSettings {
    /// Directory holding pre-operation snapshots.
    pub backup_dir: PathBuf,
    /// Age in days after which snapshots are evicted.
    pub retention_days: u64,
    /// Refuse to run mutations when the backup directory is unusable.
    pub strict: bool,
}

/// Audit trail location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSettings {
    /// Directory containing `audit.log`.
    pub dir: PathBuf,
}

/// Apache layout and packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApacheSettings {
    /// Parent directory of site document roots.
    pub sites_dir: PathBuf,
    /// Directory holding `{site}.conf` virtual hosts.
    pub vhosts_dir: PathBuf,
    /// Sub-directory of the site root served by Apache.
    pub doc_root_subdir: String,
    /// systemd unit name.
    pub service: String,
    /// Packages installed for the `apache` component.
    pub install_packages: Vec<String>,
}

/// MySQL service and database defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlSettings {
    /// systemd unit name.
    pub service: String,
    /// Character set for new databases.
    pub default_charset: String,
    /// Collation for new databases.
    pub default_collation: String,
    /// Packages installed for the `mysql` component.
    pub install_packages: Vec<String>,
}

/// PHP versions and packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpSettings {
    /// Version installed and used when none is requested.
    pub default_version: String,
    /// Versions accepted for sites.
    pub supported_versions: Vec<String>,
    /// Apt repository providing PHP builds.
    pub ppa_repository: String,
    /// Package templates; `{version}` is substituted.
    pub install_packages: Vec<String>,
}

impl PhpSettings {
    /// Whether `version` is in the supported list.
    #[must_use]
    pub fn is_supported(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|known| known == version)
    }

    /// Package names for `version`.
    #[must_use]
    pub fn packages_for(&self, version: &str) -> Vec<String> {
        self.install_packages
            .iter()
            .map(|template| template.replace(PHP_VERSION_PLACEHOLDER, version))
            .collect()
    }
}

/// Host-level safety checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecuritySettings {
    /// Require root before mutating commands run.
    pub require_root: bool,
}

impl StackConfig {
    /// Rollback settings from `rollback.*`.
    ///
    /// # Errors
    ///
    /// Returns an error when a key has the wrong shape.
    pub fn rollback(&self) -> ConfigResult<RollbackSettings> {
        Ok(RollbackSettings {
            backup_dir: self.get_path("rollback.backup_dir")?,
            retention_days: self.get_u64("rollback.retention_days")?,
            strict: self.get_or("rollback.strict", false)?,
        })
    }

    /// Audit settings from `audit.*`.
    ///
    /// # Errors
    ///
    /// Returns an error when `audit.dir` is missing or not a string.
    pub fn audit(&self) -> ConfigResult<AuditSettings> {
        Ok(AuditSettings {
            dir: self.get_path("audit.dir")?,
        })
    }

    /// Apache settings from `apache.*`.
    ///
    /// # Errors
    ///
    /// Returns an error when a key is missing or has the wrong shape.
    pub fn apache(&self) -> ConfigResult<ApacheSettings> {
        Ok(ApacheSettings {
            sites_dir: self.get_path("apache.sites_dir")?,
            vhosts_dir: self.get_path("apache.vhosts_dir")?,
            doc_root_subdir: self.get_or("apache.doc_root_subdir", String::new())?,
            service: self.get_or("apache.service", "apache2".to_string())?,
            install_packages: self.get_string_list("apache.install_packages")?,
        })
    }

    /// MySQL settings from `mysql.*`.
    ///
    /// # Errors
    ///
    /// Returns an error when a key is missing or has the wrong shape.
    pub fn mysql(&self) -> ConfigResult<MysqlSettings> {
        Ok(MysqlSettings {
            service: self.get_or("mysql.service", "mysql".to_string())?,
            default_charset: self.get_or("mysql.default_charset", "utf8mb4".to_string())?,
            default_collation: self
                .get_or("mysql.default_collation", "utf8mb4_unicode_ci".to_string())?,
            install_packages: self.get_string_list("mysql.install_packages")?,
        })
    }

    /// PHP settings from `php.*`.
    ///
    /// # Errors
    ///
    /// Returns an error when a key is missing or has the wrong shape.
    pub fn php(&self) -> ConfigResult<PhpSettings> {
        Ok(PhpSettings {
            default_version: self.get_text("php.default_version")?,
            supported_versions: self.get_string_list("php.supported_versions")?,
            ppa_repository: self.get_or("php.ppa_repository", "ppa:ondrej/php".to_string())?,
            install_packages: self.get_string_list("php.install_packages")?,
        })
    }

    /// Security settings from `security.*`.
    ///
    /// # Errors
    ///
    /// Returns an error when a key has the wrong shape.
    pub fn security(&self) -> ConfigResult<SecuritySettings> {
        Ok(SecuritySettings {
            require_root: self.get_or("security.require_root", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn php_packages_substitute_version() -> ConfigResult<()> {
        let php = StackConfig::defaults()?.php()?;
        let packages = php.packages_for("8.3");
        assert_eq!(packages.first().map(String::as_str), Some("php8.3"));
        assert!(packages.iter().any(|name| name == "php8.3-fpm"));
        assert!(php.is_supported("7.4"));
        assert!(!php.is_supported("5.6"));
        Ok(())
    }

    #[test]
    fn default_sections_are_complete() -> ConfigResult<()> {
        let config = StackConfig::defaults()?;
        assert_eq!(
            config.rollback()?,
            RollbackSettings {
                backup_dir: PathBuf::from("/var/backups/stackman"),
                retention_days: 7,
                strict: false,
            }
        );
        assert_eq!(config.audit()?.dir, PathBuf::from("/var/log/stackman"));
        assert_eq!(config.apache()?.doc_root_subdir, "web");
        assert_eq!(config.mysql()?.service, "mysql");
        assert!(config.security()?.require_root);
        Ok(())
    }
}
