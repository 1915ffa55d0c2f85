//! Pre-flight checks for site parameters and the host.
//!
//! # Design
//! - Every check runs; failures are collected rather than short-circuited.
//! - Host facts come through [`HostProbe`] so checks are testable off-host.

use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{StackError, StackResult};

/// Minimum free space on `/` before installs are allowed.
pub const MIN_FREE_BYTES: u64 = 1024 * 1024 * 1024;

/// Endpoint used to confirm outbound connectivity.
pub const CONNECTIVITY_PROBE: SocketAddr =
    SocketAddr::V4(std::net::SocketAddrV4::new(std::net::Ipv4Addr::new(8, 8, 8, 8), 53));

/// Timeout for the connectivity probe.
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Host facts consulted by [`validate_prerequisites`].
pub trait HostProbe: Send + Sync {
    /// Whether the effective user is root.
    fn is_root(&self) -> bool;

    /// Bytes available to unprivileged users on the filesystem holding `path`.
    ///
    /// # Errors
    ///
    /// Returns the OS error text when the filesystem cannot be queried.
    fn free_bytes(&self, path: &Path) -> Result<u64, String>;

    /// Whether a TCP connection to `addr` succeeds within `timeout`.
    fn can_connect(&self, addr: SocketAddr, timeout: Duration) -> bool;
}

/// Probe backed by the running system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn is_root(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }

    #[allow(clippy::unnecessary_cast, clippy::cast_lossless)]
    fn free_bytes(&self, path: &Path) -> Result<u64, String> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(|err| err.to_string())?;
        Ok((stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64))
    }

    fn can_connect(&self, addr: SocketAddr, timeout: Duration) -> bool {
        TcpStream::connect_timeout(&addr, timeout).is_ok()
    }
}

/// Check a site name: lowercase letters, digits, `.` and `-`; no leading `-`
/// and no trailing `.`.
#[must_use]
pub fn is_valid_site_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'.' || byte == b'-')
        && !name.starts_with('-')
        && !name.ends_with('.')
}

/// Reject an invalid site name.
///
/// # Errors
///
/// Returns [`StackError::Validation`] when the name is not acceptable.
pub fn validate_site_name(name: &str) -> StackResult<()> {
    if is_valid_site_name(name) {
        Ok(())
    } else {
        Err(StackError::Validation {
            errors: vec![site_name_message(name)],
        })
    }
}

fn site_name_message(name: &str) -> String {
    format!(
        "invalid site name '{name}': only a-z, 0-9, '.' and '-' are allowed, and it must not start with '-' or end with '.'"
    )
}

/// Validate a new site before anything is created.
///
/// # Errors
///
/// Returns [`StackError::Validation`] listing every problem: bad name,
/// unsupported PHP version, existing vhost file, existing document root.
pub fn validate_site_config(
    site: &str,
    php_version: &str,
    supported_versions: &[String],
    vhosts_dir: &Path,
    sites_dir: &Path,
) -> StackResult<()> {
    let mut errors = Vec::new();
    if !is_valid_site_name(site) {
        errors.push(site_name_message(site));
    }
    if !supported_versions.iter().any(|known| known == php_version) {
        errors.push(format!(
            "unsupported PHP version {php_version}; supported: {}",
            supported_versions.join(", ")
        ));
    }
    let vhost = vhosts_dir.join(format!("{site}.conf"));
    if vhost.exists() {
        errors.push(format!(
            "virtual host for {site} already exists at {}",
            vhost.display()
        ));
    }
    let doc_root = sites_dir.join(site);
    if doc_root.exists() {
        errors.push(format!("document root {} already exists", doc_root.display()));
    }
    finish(errors)
}

/// Check that the host can take an install.
///
/// # Errors
///
/// Returns [`StackError::Validation`] listing every failed check.
pub fn validate_prerequisites(probe: &dyn HostProbe, require_root: bool) -> StackResult<()> {
    let mut errors = Vec::new();
    if require_root && !probe.is_root() {
        errors.push("must run as root (use sudo)".to_string());
    }
    match probe.free_bytes(Path::new("/")) {
        Ok(free) if free < MIN_FREE_BYTES => errors.push(format!(
            "insufficient disk space: {:.1} GiB free (minimum 1 GiB)",
            gib(free)
        )),
        Ok(free) => debug!(free_bytes = free, "disk space check passed"),
        Err(err) => errors.push(format!("could not check disk space: {err}")),
    }
    if !probe.can_connect(CONNECTIVITY_PROBE, CONNECTIVITY_TIMEOUT) {
        errors.push("no internet connectivity".to_string());
    }
    finish(errors)
}

#[allow(clippy::cast_precision_loss)]
fn gib(bytes: u64) -> f64 {
    bytes as f64 / MIN_FREE_BYTES as f64
}

fn finish(errors: Vec<String>) -> StackResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StackError::Validation { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_name_rules() {
        for good in ["example.org", "my-site.test", "a", "site1"] {
            assert!(is_valid_site_name(good), "{good}");
        }
        for bad in ["", "-invalid-", "trailing.", "Upper.org", "under_score", "sp ace", "a/b"] {
            assert!(!is_valid_site_name(bad), "{bad}");
        }
        assert!(validate_site_name("-x").is_err());
    }

    struct FakeProbe {
        root: bool,
        free: Result<u64, String>,
        online: bool,
    }

    impl HostProbe for FakeProbe {
        fn is_root(&self) -> bool {
            self.root
        }

        fn free_bytes(&self, _path: &Path) -> Result<u64, String> {
            self.free.clone()
        }

        fn can_connect(&self, _addr: SocketAddr, _timeout: Duration) -> bool {
            self.online
        }
    }

    #[test]
    fn prerequisites_pass_on_healthy_host() {
        let probe = FakeProbe {
            root: true,
            free: Ok(2 * MIN_FREE_BYTES),
            online: true,
        };
        assert!(validate_prerequisites(&probe, true).is_ok());
    }

    #[test]
    fn prerequisites_report_every_failure() {
        let probe = FakeProbe {
            root: false,
            free: Ok(MIN_FREE_BYTES / 2),
            online: false,
        };
        let err = validate_prerequisites(&probe, true).err();
        let errors = err
            .as_ref()
            .and_then(StackError::validation_errors)
            .unwrap_or_default();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], "must run as root (use sudo)");
        assert!(errors[1].contains("0.5 GiB"));
        assert_eq!(errors[2], "no internet connectivity");
    }

    #[test]
    fn root_check_can_be_disabled_and_statvfs_errors_are_reported() {
        let probe = FakeProbe {
            root: false,
            free: Err("permission denied".into()),
            online: true,
        };
        let err = validate_prerequisites(&probe, false).err();
        let errors = err
            .as_ref()
            .and_then(StackError::validation_errors)
            .unwrap_or_default();
        assert_eq!(errors, ["could not check disk space: permission denied"]);
    }
}
