//! MySQL server: packages, databases, users, and the service unit.
//!
//! Statements run as root through `mysql -e`. Identifiers come from validated
//! site names and passwords are alphanumeric, so no quoting beyond backticks
//! and single quotes is needed.

use std::sync::Arc;

use stackman_config::MysqlSettings;
use stackman_platform::{
    CommandRunner, CommandSpec, PackageManager, ServiceAction, ServiceController, ServiceStatus,
};
use tracing::info;

use crate::error::{StackError, StackResult};

/// Host part used for site database users.
pub const DB_USER_HOST: &str = "localhost";

/// MySQL operations.
pub struct MysqlManager {
    settings: MysqlSettings,
    runner: Arc<dyn CommandRunner>,
    services: ServiceController,
}

impl MysqlManager {
    /// Manager over `settings` running commands through `runner`.
    #[must_use]
    pub fn new(settings: MysqlSettings, runner: Arc<dyn CommandRunner>) -> Self {
        let services = ServiceController::new(Arc::clone(&runner));
        Self {
            settings,
            runner,
            services,
        }
    }

    /// Configured settings.
    #[must_use]
    pub const fn settings(&self) -> &MysqlSettings {
        &self.settings
    }

    /// Install the server when missing and make sure the unit is running.
    ///
    /// # Errors
    ///
    /// Returns an error when the package manager or `systemctl start` fails.
    pub fn install(&self, packages: &dyn PackageManager) -> StackResult<Vec<String>> {
        packages
            .update_cache()
            .map_err(StackError::platform("mysql.update_cache"))?;
        let installed = packages
            .ensure_installed(&self.settings.install_packages)
            .map_err(StackError::platform("mysql.install"))?;
        if !installed.is_empty() {
            self.services
                .manage(&self.settings.service, ServiceAction::Start)
                .map_err(StackError::platform("mysql.start"))?;
        }
        Ok(installed)
    }

    /// `CREATE DATABASE IF NOT EXISTS` with the configured charset and collation.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    pub fn create_database(&self, database: &str) -> StackResult<()> {
        info!(database, "creating database");
        self.execute(
            "mysql.create_database",
            &format!(
                "CREATE DATABASE IF NOT EXISTS `{database}` CHARACTER SET {} COLLATE {};",
                self.settings.default_charset, self.settings.default_collation
            ),
        )
    }

    /// `CREATE USER IF NOT EXISTS` identified by `password`.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    pub fn create_user(&self, username: &str, password: &str) -> StackResult<()> {
        info!(username, "creating database user");
        self.execute(
            "mysql.create_user",
            &format!(
                "CREATE USER IF NOT EXISTS '{username}'@'{DB_USER_HOST}' IDENTIFIED BY '{password}';"
            ),
        )
    }

    /// Grant all privileges on `database` to `username`, then flush.
    ///
    /// # Errors
    ///
    /// Returns an error when either statement fails.
    pub fn grant_privileges(&self, database: &str, username: &str) -> StackResult<()> {
        self.execute(
            "mysql.grant",
            &format!("GRANT ALL PRIVILEGES ON `{database}`.* TO '{username}'@'{DB_USER_HOST}';"),
        )?;
        self.execute("mysql.flush", "FLUSH PRIVILEGES;")
    }

    /// State of the MySQL unit.
    ///
    /// # Errors
    ///
    /// Returns an error when `systemctl` exists but cannot be run.
    pub fn status(&self) -> StackResult<ServiceStatus> {
        self.services
            .query(&self.settings.service)
            .map_err(StackError::platform("mysql.status"))
    }

    fn execute(&self, operation: &'static str, statement: &str) -> StackResult<()> {
        self.runner
            .run_checked(&CommandSpec::new("mysql").arg("-e").secret_arg(statement))
            .map_err(StackError::platform(operation))?;
        Ok(())
    }
}
