//! Stack operations with snapshot protection, dry run, and audit.
//!
//! # Design
//! - Every mutation runs inside [`ProtectedOperations::run_protected`] over the
//!   files it rewrites; a failure restores them and surfaces as
//!   [`StackError::RolledBack`].
//! - Validation happens before any snapshot is taken.
//! - Dry run returns the plan with `applied: false` and touches nothing.
//! - Audit entries are written only after a mutation succeeds.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use stackman_config::{SecuritySettings, StackConfig};
use stackman_platform::{
    CommandRunner, DEFAULT_OS_RELEASE, DryRunRunner, PackageManager, ServiceStatus, SystemRunner,
    detect_package_manager, package_manager_for,
};
use stackman_rollback::{
    ArtifactInfo, EvictionSummary, ProtectedOperations, ProtectionMode, SnapshotStore,
};
use stackman_telemetry::AuditLog;
use tracing::{info, warn};

use crate::apache::{ApacheManager, SiteEntry};
use crate::drupal::install_drupal;
use crate::error::{StackError, StackResult};
use crate::mysql::MysqlManager;
use crate::php::PhpManager;
use crate::site::{SiteCredentials, SitePlan, database_name, database_user, generate_password};
use crate::validate::{
    HostProbe, SystemProbe, validate_prerequisites, validate_site_config, validate_site_name,
};
use crate::vhost::rewrite_php_handler;

/// Installable stack component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Apache HTTP Server.
    Apache,
    /// MySQL server.
    Mysql,
    /// PHP runtime at the configured default version.
    Php,
    /// All of the above.
    All,
}

impl Component {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apache => "apache",
            Self::Mysql => "mysql",
            Self::Php => "php",
            Self::All => "all",
        }
    }

    /// Expand `all`, drop duplicates, and order as apache, mysql, php.
    #[must_use]
    pub fn resolve(requested: &[Self]) -> Vec<Self> {
        [Self::Apache, Self::Mysql, Self::Php]
            .into_iter()
            .filter(|component| {
                requested.contains(&Self::All) || requested.contains(component)
            })
            .collect()
    }
}

impl Display for Component {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = StackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "apache" => Ok(Self::Apache),
            "mysql" => Ok(Self::Mysql),
            "php" => Ok(Self::Php),
            "all" => Ok(Self::All),
            other => Err(StackError::Validation {
                errors: vec![format!(
                    "unknown component '{other}'; expected apache, mysql, php, or all"
                )],
            }),
        }
    }
}

/// One component in an install plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallStep {
    /// Component being installed.
    pub component: Component,
    /// Packages it needs.
    pub packages: Vec<String>,
}

/// Outcome of [`StackManager::install_components`].
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// Planned steps in execution order.
    pub steps: Vec<InstallStep>,
    /// Packages actually installed (already present ones are skipped).
    pub installed: Vec<String>,
    /// `false` for a dry run.
    pub applied: bool,
}

/// Outcome of [`StackManager::create_site`].
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    /// The executed plan.
    pub plan: SitePlan,
    /// Generated credentials; `None` for a dry run.
    pub credentials: Option<SiteCredentials>,
    /// `false` for a dry run.
    pub applied: bool,
}

/// Outcome of [`StackManager::switch_php`].
#[derive(Debug, Clone, Serialize)]
pub struct PhpSwitchReport {
    /// Site whose vhost was rewritten.
    pub site: String,
    /// Vhost file.
    pub vhost_file: PathBuf,
    /// Version found in the vhost before the switch.
    pub previous_version: String,
    /// Version now configured.
    pub php_version: String,
    /// `false` for a dry run.
    pub applied: bool,
}

/// Snapshot of the stack for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StackStatus {
    /// Apache unit state.
    pub apache: ServiceStatus,
    /// MySQL unit state.
    pub mysql: ServiceStatus,
    /// Parent of site document roots.
    pub sites_dir: PathBuf,
    /// Vhost directory.
    pub vhosts_dir: PathBuf,
    /// Snapshot directory.
    pub backup_dir: PathBuf,
    /// Whether mutations currently run with rollback.
    pub rollback_protected: bool,
}

/// Entry point for every stack operation.
pub struct StackManager {
    apache: ApacheManager,
    mysql: MysqlManager,
    php: PhpManager,
    security: SecuritySettings,
    runner: Arc<dyn CommandRunner>,
    packages: Option<Arc<dyn PackageManager>>,
    probe: Arc<dyn HostProbe>,
    protected: ProtectedOperations,
    audit: AuditLog,
    dry_run: bool,
}

impl StackManager {
    /// Manager over `config` using the given runner, controller, and audit log.
    ///
    /// The package manager is detected from `/etc/os-release` on first use
    /// unless one is supplied with [`StackManager::with_package_manager`].
    ///
    /// # Errors
    ///
    /// Returns an error when a configuration section is malformed.
    pub fn new(
        config: &StackConfig,
        runner: Arc<dyn CommandRunner>,
        protected: ProtectedOperations,
        audit: AuditLog,
    ) -> StackResult<Self> {
        Ok(Self {
            apache: ApacheManager::new(config.apache()?, Arc::clone(&runner)),
            mysql: MysqlManager::new(config.mysql()?, Arc::clone(&runner)),
            php: PhpManager::new(config.php()?, Arc::clone(&runner)),
            security: config.security()?,
            runner,
            packages: None,
            probe: Arc::new(SystemProbe),
            protected,
            audit,
            dry_run: false,
        })
    }

    /// Manager wired to the real host: system commands, the configured
    /// snapshot directory and mode, and the configured audit directory.
    ///
    /// With `dry_run` commands are only logged and nothing is audited.
    ///
    /// # Errors
    ///
    /// Returns an error when a configuration section is malformed.
    pub fn for_host(config: &StackConfig, dry_run: bool) -> StackResult<Self> {
        let rollback = config.rollback()?;
        let store = SnapshotStore::open(&rollback.backup_dir);
        let mode = if rollback.strict {
            ProtectionMode::Strict
        } else {
            ProtectionMode::Degrade
        };
        let protected = ProtectedOperations::new(store)
            .with_mode(mode)
            .with_retention_days(rollback.retention_days);
        let (runner, audit): (Arc<dyn CommandRunner>, AuditLog) = if dry_run {
            (Arc::new(DryRunRunner), AuditLog::disabled())
        } else {
            (Arc::new(SystemRunner), AuditLog::open(config.audit()?.dir))
        };
        Ok(Self::new(config, runner, protected, audit)?.with_dry_run(dry_run))
    }

    /// Use `packages` instead of detecting the host package manager.
    #[must_use]
    pub fn with_package_manager(mut self, packages: Arc<dyn PackageManager>) -> Self {
        self.packages = Some(packages);
        self
    }

    /// Replace the host probe used for prerequisite checks.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn HostProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Plan mutations without performing them.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether this manager only plans.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// PHP version used when none is requested.
    #[must_use]
    pub fn default_php_version(&self) -> &str {
        &self.php.settings().default_version
    }

    /// Protection controller used for mutations.
    #[must_use]
    pub const fn protected(&self) -> &ProtectedOperations {
        &self.protected
    }

    /// Install the requested components.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Validation`] when host prerequisites fail, or
    /// the failing step wrapped in [`StackError::RolledBack`].
    pub fn install_components(&self, requested: &[Component]) -> StackResult<InstallReport> {
        validate_prerequisites(self.probe.as_ref(), self.security.require_root)?;
        let php_version = self.php.settings().default_version.clone();
        let steps: Vec<InstallStep> = Component::resolve(requested)
            .into_iter()
            .map(|component| InstallStep {
                component,
                packages: match component {
                    Component::Apache => self.apache.settings().install_packages.clone(),
                    Component::Mysql => self.mysql.settings().install_packages.clone(),
                    Component::Php | Component::All => {
                        self.php.settings().packages_for(&php_version)
                    }
                },
            })
            .collect();

        if self.dry_run {
            return Ok(InstallReport {
                steps,
                installed: Vec::new(),
                applied: false,
            });
        }

        let packages = self.package_manager()?;
        let installed = self.protected.run_protected(
            "install_components",
            Vec::<PathBuf>::new(),
            || -> StackResult<Vec<String>> {
                let mut installed = Vec::new();
                for step in &steps {
                    info!(component = %step.component, "installing component");
                    let added = match step.component {
                        Component::Apache => self.apache.install(packages.as_ref())?,
                        Component::Mysql => self.mysql.install(packages.as_ref())?,
                        Component::Php | Component::All => {
                            self.php.install(packages.as_ref(), &php_version)?
                        }
                    };
                    installed.extend(added);
                }
                Ok(installed)
            },
        )?;

        let names: Vec<&str> = steps.iter().map(|step| step.component.as_str()).collect();
        self.audit.record(
            "install_components",
            "lamp",
            json!({"components": names, "installed": installed}),
        );
        Ok(InstallReport {
            steps,
            installed,
            applied: true,
        })
    }

    /// Validate a new site and build its plan.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Validation`] listing every problem.
    pub fn plan_site(
        &self,
        site: &str,
        php_version: &str,
        drupal_version: Option<&str>,
    ) -> StackResult<SitePlan> {
        let apache = self.apache.settings();
        validate_site_config(
            site,
            php_version,
            &self.php.settings().supported_versions,
            &apache.vhosts_dir,
            &apache.sites_dir,
        )?;
        let doc_root = self.apache.doc_root(site);
        let database = database_name(site);
        Ok(SitePlan {
            site: site.to_string(),
            php_version: php_version.to_string(),
            drupal_version: drupal_version
                .filter(|version| !version.is_empty())
                .map(str::to_string),
            served_root: self.apache.served_root(&doc_root),
            doc_root,
            vhost_file: self.apache.vhost_path(site),
            db_user: database_user(&database),
            database,
        })
    }

    /// Create the site described by `plan`: document root, vhost, database,
    /// user, grants, Apache reload, and optionally Drupal.
    ///
    /// # Errors
    ///
    /// Returns the failing step wrapped in [`StackError::RolledBack`], or
    /// [`StackError::BackupUnavailable`] in strict mode.
    pub fn create_site(&self, plan: &SitePlan) -> StackResult<SiteReport> {
        if self.dry_run {
            return Ok(SiteReport {
                plan: plan.clone(),
                credentials: None,
                applied: false,
            });
        }

        let credentials = self.protected.run_protected(
            "create_site",
            [&plan.doc_root, &plan.vhost_file],
            || self.execute_site(plan),
        )?;

        self.audit.record(
            "create_site",
            &plan.site,
            json!({"php": plan.php_version, "drupal": plan.drupal_version}),
        );
        Ok(SiteReport {
            plan: plan.clone(),
            credentials: Some(credentials),
            applied: true,
        })
    }

    fn execute_site(&self, plan: &SitePlan) -> StackResult<SiteCredentials> {
        let password = generate_password();
        fs::create_dir_all(&plan.served_root)
            .map_err(|source| StackError::io("site.create_root", &plan.served_root, source))?;
        self.apache
            .write_vhost(&plan.site, &plan.doc_root, &plan.php_version)?;
        self.mysql.create_database(&plan.database)?;
        self.mysql.create_user(&plan.db_user, &password)?;
        self.mysql.grant_privileges(&plan.database, &plan.db_user)?;
        self.apache.reload()?;
        let admin_password = match &plan.drupal_version {
            Some(version) => install_drupal(self.runner.as_ref(), plan, version, &password)?,
            None => None,
        };
        Ok(SiteCredentials {
            database: plan.database.clone(),
            username: plan.db_user.clone(),
            password,
            admin_password,
        })
    }

    /// Write and enable the vhost for `site` under protection.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Validation`] for an invalid site name, otherwise
    /// the failing step wrapped in [`StackError::RolledBack`].
    pub fn create_vhost(&self, site: &str, doc_root: &Path, php_version: &str) -> StackResult<PathBuf> {
        validate_site_name(site)?;
        let vhost_file = self.apache.vhost_path(site);
        if self.dry_run {
            return Ok(vhost_file);
        }
        let path = self.protected.run_protected("create_vhost", [&vhost_file], || {
            self.apache.write_vhost(site, doc_root, php_version)
        })?;
        self.audit
            .record("create_vhost", site, json!({"php": php_version}));
        Ok(path)
    }

    /// Point the site's PHP-FPM handler at `php_version` and reload Apache.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::VhostNotFound`] or
    /// [`StackError::PhpHandlerNotFound`] before anything is modified, or the
    /// failing step wrapped in [`StackError::RolledBack`].
    pub fn switch_php(&self, site: &str, php_version: &str) -> StackResult<PhpSwitchReport> {
        self.php.ensure_supported(php_version)?;
        let vhost_file = self.apache.vhost_path(site);
        if !vhost_file.is_file() {
            return Err(StackError::VhostNotFound {
                site: site.to_string(),
                path: vhost_file,
            });
        }
        let content = fs::read_to_string(&vhost_file)
            .map_err(|source| StackError::io("vhost.read", &vhost_file, source))?;
        let rewrite = rewrite_php_handler(&content, php_version)?.ok_or_else(|| {
            StackError::PhpHandlerNotFound {
                path: vhost_file.clone(),
            }
        })?;
        let mut report = PhpSwitchReport {
            site: site.to_string(),
            vhost_file,
            previous_version: rewrite.previous_version,
            php_version: php_version.to_string(),
            applied: false,
        };
        if self.dry_run {
            return Ok(report);
        }

        self.protected
            .run_protected("switch_php", [&report.vhost_file], || -> StackResult<()> {
                fs::write(&report.vhost_file, &rewrite.content).map_err(|source| {
                    StackError::io("vhost.write", &report.vhost_file, source)
                })?;
                self.apache.reload()
            })?;

        self.audit.record(
            "switch_php",
            site,
            json!({"from": report.previous_version, "new_php_version": php_version}),
        );
        report.applied = true;
        Ok(report)
    }

    /// Sites configured in the vhosts directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory exists but cannot be read.
    pub fn list_sites(&self) -> StackResult<Vec<SiteEntry>> {
        self.apache.list_sites()
    }

    /// Service states and configured paths.
    ///
    /// # Errors
    ///
    /// Returns an error when `systemctl` exists but cannot be run.
    pub fn status(&self) -> StackResult<StackStatus> {
        let apache = self.apache.settings();
        Ok(StackStatus {
            apache: self.apache.status()?,
            mysql: self.mysql.status()?,
            sites_dir: apache.sites_dir.clone(),
            vhosts_dir: apache.vhosts_dir.clone(),
            backup_dir: self.protected.store().root().to_path_buf(),
            rollback_protected: self.protected.is_protected(),
        })
    }

    /// Snapshot artifacts, optionally only those of one operation name.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot directory cannot be read.
    pub fn list_snapshots(&self, operation: Option<&str>) -> StackResult<Vec<ArtifactInfo>> {
        self.protected
            .store()
            .list_artifacts(operation)
            .map_err(StackError::from)
    }

    /// Evict snapshots older than `days` (or the configured retention).
    #[must_use]
    pub fn prune_snapshots(&self, days: Option<u64>) -> EvictionSummary {
        let days = days.unwrap_or_else(|| self.protected.retention_days());
        if self.dry_run {
            warn!(days, "dry run: snapshots not pruned");
            return EvictionSummary::default();
        }
        let summary = self.protected.store().evict_older_than(days);
        if summary.removed > 0 {
            self.audit.record(
                "prune_snapshots",
                &self.protected.store().root().display().to_string(),
                json!({"days": days, "removed": summary.removed, "failed": summary.failed}),
            );
        }
        summary
    }

    fn package_manager(&self) -> StackResult<Arc<dyn PackageManager>> {
        if let Some(packages) = &self.packages {
            return Ok(Arc::clone(packages));
        }
        let kind = detect_package_manager(Path::new(DEFAULT_OS_RELEASE))
            .map_err(StackError::platform("detect_package_manager"))?;
        Ok(Arc::from(package_manager_for(kind, Arc::clone(&self.runner))))
    }
}
