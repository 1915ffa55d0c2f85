//! Package installation through the host package manager.
//!
//! # Design
//! - One trait, one implementation per family; callers pick through
//!   [`package_manager_for`].
//! - Installs are idempotent at the caller level: `is_installed` is checked
//!   before `install` so already-present packages are skipped.

use std::sync::Arc;

use tracing::{info, warn};

use crate::command::{CommandRunner, CommandSpec};
use crate::distro::PackageManagerKind;
use crate::error::{PlatformError, PlatformResult};

/// Operations every supported package manager provides.
pub trait PackageManager: Send + Sync {
    /// Family of this manager.
    fn kind(&self) -> PackageManagerKind;

    /// Refresh package metadata.
    ///
    /// # Errors
    ///
    /// Returns an error when the refresh command fails.
    fn update_cache(&self) -> PlatformResult<()>;

    /// Whether `package` is already installed.
    ///
    /// # Errors
    ///
    /// Returns an error when the query command cannot be run.
    fn is_installed(&self, package: &str) -> PlatformResult<bool>;

    /// Install `packages` non-interactively.
    ///
    /// # Errors
    ///
    /// Returns an error when the install command fails.
    fn install(&self, packages: &[String]) -> PlatformResult<()>;

    /// Register an additional package repository and refresh metadata.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository cannot be added.
    fn add_repository(&self, repository: &str) -> PlatformResult<()>;

    /// Install whatever in `packages` is missing and return what was installed.
    ///
    /// # Errors
    ///
    /// Returns an error when a query or the install fails.
    fn ensure_installed(&self, packages: &[String]) -> PlatformResult<Vec<String>> {
        let mut missing = Vec::new();
        for package in packages {
            if self.is_installed(package)? {
                info!(package = %package, "package already installed");
            } else {
                missing.push(package.clone());
            }
        }
        if !missing.is_empty() {
            self.install(&missing)?;
        }
        Ok(missing)
    }
}

/// Debian/Ubuntu package manager.
pub struct Apt {
    runner: Arc<dyn CommandRunner>,
}

impl Apt {
    /// Apt driven by `runner`.
    #[must_use]
    pub const fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageManager for Apt {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Apt
    }

    fn update_cache(&self) -> PlatformResult<()> {
        self.runner
            .run_checked(&CommandSpec::new("apt-get").arg("update"))?;
        Ok(())
    }

    fn is_installed(&self, package: &str) -> PlatformResult<bool> {
        let output = self
            .runner
            .run(&CommandSpec::new("dpkg").args(["-l", package]))?;
        Ok(output.success() && dpkg_lists_installed(&output.stdout, package))
    }

    fn add_repository(&self, repository: &str) -> PlatformResult<()> {
        self.ensure_installed(&["software-properties-common".to_string()])?;
        info!(repository = %repository, "adding apt repository");
        self.runner
            .run_checked(&CommandSpec::new("add-apt-repository").args(["-y", repository]))?;
        self.update_cache()
    }

    fn install(&self, packages: &[String]) -> PlatformResult<()> {
        info!(packages = ?packages, "installing packages with apt");
        self.runner.run_checked(
            &CommandSpec::new("apt-get")
                .args(["install", "-y"])
                .args(packages.iter().cloned()),
        )?;
        Ok(())
    }
}

fn dpkg_lists_installed(listing: &str, package: &str) -> bool {
    listing.lines().any(|line| {
        let mut columns = line.split_whitespace();
        columns.next() == Some("ii")
            && columns.next().is_some_and(|name| {
                name == package
                    || name
                        .strip_prefix(package)
                        .is_some_and(|rest| rest.starts_with(':'))
            })
    })
}

/// RHEL-family package manager.
pub struct Yum {
    runner: Arc<dyn CommandRunner>,
}

impl Yum {
    /// Yum driven by `runner`.
    #[must_use]
    pub const fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageManager for Yum {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Yum
    }

    fn update_cache(&self) -> PlatformResult<()> {
        let spec = CommandSpec::new("yum").arg("check-update");
        let output = self.runner.run(&spec)?;
        // 100 means updates are available.
        match output.status {
            Some(0 | 100) => Ok(()),
            status => {
                warn!(command = %spec, status = ?status, "yum check-update failed");
                Err(PlatformError::CommandFailed {
                    command: spec.to_string(),
                    status,
                    stderr: output.stderr.trim().to_string(),
                })
            }
        }
    }

    fn is_installed(&self, package: &str) -> PlatformResult<bool> {
        let output = self
            .runner
            .run(&CommandSpec::new("rpm").args(["-q", package]))?;
        Ok(output.success())
    }

    fn add_repository(&self, repository: &str) -> PlatformResult<()> {
        self.ensure_installed(&["yum-utils".to_string()])?;
        info!(repository = %repository, "adding yum repository");
        self.runner.run_checked(
            &CommandSpec::new("yum-config-manager").args(["--add-repo", repository]),
        )?;
        Ok(())
    }

    fn install(&self, packages: &[String]) -> PlatformResult<()> {
        info!(packages = ?packages, "installing packages with yum");
        self.runner.run_checked(
            &CommandSpec::new("yum")
                .args(["install", "-y"])
                .args(packages.iter().cloned()),
        )?;
        Ok(())
    }
}

/// Package manager implementation for `kind`.
#[must_use]
pub fn package_manager_for(
    kind: PackageManagerKind,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn PackageManager> {
    match kind {
        PackageManagerKind::Apt => Box::new(Apt::new(runner)),
        PackageManagerKind::Yum => Box::new(Yum::new(runner)),
    }
}
