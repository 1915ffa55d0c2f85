//! PHP runtime installation.

use std::sync::Arc;

use stackman_config::PhpSettings;
use stackman_platform::{CommandRunner, CommandSpec, PackageManager, PackageManagerKind};
use tracing::info;

use crate::error::{StackError, StackResult};

const APT_SOURCES_DIR: &str = "/etc/apt/sources.list.d/";

/// PHP operations.
pub struct PhpManager {
    settings: PhpSettings,
    runner: Arc<dyn CommandRunner>,
}

impl PhpManager {
    /// Manager over `settings` running commands through `runner`.
    #[must_use]
    pub const fn new(settings: PhpSettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self { settings, runner }
    }

    /// Configured settings.
    #[must_use]
    pub const fn settings(&self) -> &PhpSettings {
        &self.settings
    }

    /// Reject versions outside `php.supported_versions`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Validation`] for unsupported versions.
    pub fn ensure_supported(&self, version: &str) -> StackResult<()> {
        if self.settings.is_supported(version) {
            Ok(())
        } else {
            Err(StackError::Validation {
                errors: vec![format!(
                    "unsupported PHP version {version}; supported: {}",
                    self.settings.supported_versions.join(", ")
                )],
            })
        }
    }

    /// Install PHP `version` and its modules.
    ///
    /// On apt hosts the configured PPA is added first unless a source list
    /// already references it.
    ///
    /// # Errors
    ///
    /// Returns an error for unsupported versions or package manager failures.
    pub fn install(&self, packages: &dyn PackageManager, version: &str) -> StackResult<Vec<String>> {
        self.ensure_supported(version)?;
        if packages.kind() == PackageManagerKind::Apt && !self.ppa_configured() {
            packages
                .add_repository(&self.settings.ppa_repository)
                .map_err(StackError::platform("php.add_repository"))?;
        }
        let runtime = format!("php{version}");
        if packages
            .is_installed(&runtime)
            .map_err(StackError::platform("php.query"))?
        {
            info!(version, "php already installed");
            return Ok(Vec::new());
        }
        packages
            .ensure_installed(&self.settings.packages_for(version))
            .map_err(StackError::platform("php.install"))
    }

    fn ppa_configured(&self) -> bool {
        let needle = self
            .settings
            .ppa_repository
            .trim_start_matches("ppa:")
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        self.runner
            .run(&CommandSpec::new("grep").args(["-rh", "^deb", APT_SOURCES_DIR]))
            .is_ok_and(|output| output.success() && output.stdout.contains(&needle))
    }
}
