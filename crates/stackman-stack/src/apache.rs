//! Apache HTTP Server: packages, virtual hosts, and the service unit.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use stackman_config::ApacheSettings;
use stackman_platform::{
    CommandRunner, CommandSpec, PackageManager, ServiceAction, ServiceController, ServiceStatus,
};
use tracing::{info, warn};

use crate::error::{StackError, StackResult};
use crate::vhost::render_vhost;

/// Site found in the vhosts directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteEntry {
    /// Site name (file stem).
    pub name: String,
    /// Vhost file.
    pub config_file: PathBuf,
}

/// Apache operations. None of these take snapshots; callers wrap them.
pub struct ApacheManager {
    settings: ApacheSettings,
    runner: Arc<dyn CommandRunner>,
    services: ServiceController,
}

impl ApacheManager {
    /// Manager over `settings` running commands through `runner`.
    #[must_use]
    pub fn new(settings: ApacheSettings, runner: Arc<dyn CommandRunner>) -> Self {
        let services = ServiceController::new(Arc::clone(&runner));
        Self {
            settings,
            runner,
            services,
        }
    }

    /// Configured settings.
    #[must_use]
    pub const fn settings(&self) -> &ApacheSettings {
        &self.settings
    }

    /// `{vhosts_dir}/{site}.conf`.
    #[must_use]
    pub fn vhost_path(&self, site: &str) -> PathBuf {
        self.settings.vhosts_dir.join(format!("{site}.conf"))
    }

    /// `{sites_dir}/{site}`.
    #[must_use]
    pub fn doc_root(&self, site: &str) -> PathBuf {
        self.settings.sites_dir.join(site)
    }

    /// Directory Apache serves for a site rooted at `doc_root`.
    #[must_use]
    pub fn served_root(&self, doc_root: &Path) -> PathBuf {
        if self.settings.doc_root_subdir.is_empty() {
            doc_root.to_path_buf()
        } else {
            doc_root.join(&self.settings.doc_root_subdir)
        }
    }

    /// Install the configured Apache packages that are missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the package manager fails.
    pub fn install(&self, packages: &dyn PackageManager) -> StackResult<Vec<String>> {
        packages
            .update_cache()
            .map_err(StackError::platform("apache.update_cache"))?;
        packages
            .ensure_installed(&self.settings.install_packages)
            .map_err(StackError::platform("apache.install"))
    }

    /// Write the vhost for `site`, enable it, and disable the default site.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written or `a2ensite` fails.
    pub fn write_vhost(&self, site: &str, doc_root: &Path, php_version: &str) -> StackResult<PathBuf> {
        let path = self.vhost_path(site);
        let content = render_vhost(site, &self.served_root(doc_root), php_version);
        fs::write(&path, content).map_err(|source| StackError::io("vhost.write", &path, source))?;
        info!(site, path = %path.display(), "virtual host written");

        self.runner
            .run_checked(&CommandSpec::new("a2ensite").arg(site))
            .map_err(StackError::platform("apache.enable_site"))?;
        if let Err(err) = self
            .runner
            .run_checked(&CommandSpec::new("a2dissite").arg("000-default"))
        {
            warn!(error = %err, "could not disable default site");
        }
        Ok(path)
    }

    /// Reload the Apache unit.
    ///
    /// # Errors
    ///
    /// Returns an error when `systemctl reload` fails.
    pub fn reload(&self) -> StackResult<()> {
        self.services
            .manage(&self.settings.service, ServiceAction::Reload)
            .map_err(StackError::platform("apache.reload"))
    }

    /// State of the Apache unit.
    ///
    /// # Errors
    ///
    /// Returns an error when `systemctl` exists but cannot be run.
    pub fn status(&self) -> StackResult<ServiceStatus> {
        self.services
            .query(&self.settings.service)
            .map_err(StackError::platform("apache.status"))
    }

    /// Sites with a `*.conf` file in the vhosts directory, sorted by name.
    ///
    /// A missing vhosts directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory exists but cannot be read.
    pub fn list_sites(&self) -> StackResult<Vec<SiteEntry>> {
        let dir = &self.settings.vhosts_dir;
        if !dir.is_dir() {
            warn!(path = %dir.display(), "vhosts directory does not exist");
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(dir).map_err(|source| StackError::io("sites.list", dir, source))?;
        let mut sites = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StackError::io("sites.list", dir, source))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "conf")
                && path.is_file()
                && let Some(name) = path.file_stem().and_then(|stem| stem.to_str())
            {
                sites.push(SiteEntry {
                    name: name.to_string(),
                    config_file: path.clone(),
                });
            }
        }
        sites.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(sites)
    }
}
