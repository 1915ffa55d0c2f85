//! Distribution detection from `/etc/os-release`.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{PlatformError, PlatformResult};

/// Location of the os-release file on supported hosts.
pub const DEFAULT_OS_RELEASE: &str = "/etc/os-release";

/// Package manager family used by a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManagerKind {
    /// Debian and Ubuntu.
    Apt,
    /// RHEL, CentOS, Rocky, and Fedora.
    Yum,
}

impl PackageManagerKind {
    /// Lowercase name used in logs and output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Yum => "yum",
        }
    }
}

/// Extract the `ID` value from os-release content.
///
/// Quotes are stripped and the value is lowercased. Returns `None` when no
/// `ID=` line is present.
#[must_use]
pub fn parse_os_release_id(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let value = line.trim().strip_prefix("ID=")?;
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    })
}

/// Map a distribution identifier to its package manager family.
///
/// # Errors
///
/// Returns [`PlatformError::UnsupportedDistribution`] for unknown identifiers.
pub fn package_manager_kind(id: &str) -> PlatformResult<PackageManagerKind> {
    match id {
        "ubuntu" | "debian" => Ok(PackageManagerKind::Apt),
        "rhel" | "centos" | "rocky" | "fedora" => Ok(PackageManagerKind::Yum),
        other => Err(PlatformError::UnsupportedDistribution {
            id: other.to_string(),
        }),
    }
}

/// Read `os_release` and decide which package manager the host uses.
///
/// # Errors
///
/// Returns an error when the file cannot be read or names an unsupported
/// distribution.
pub fn detect_package_manager(os_release: &Path) -> PlatformResult<PackageManagerKind> {
    let content = fs::read_to_string(os_release).map_err(|source| PlatformError::OsRelease {
        path: os_release.to_path_buf(),
        source,
    })?;
    let id = parse_os_release_id(&content).unwrap_or_default();
    let kind = package_manager_kind(&id)?;
    debug!(distribution = %id, package_manager = kind.as_str(), "detected distribution");
    Ok(kind)
}
