//! Command handlers grouped by concern.

mod install;
mod sites;
mod status;

pub(crate) use install::handle_install;
pub(crate) use sites::{handle_create_site, handle_list_sites, handle_switch_php};
pub(crate) use status::{handle_snapshots_list, handle_snapshots_prune, handle_status};

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::sync::Arc;

    use anyhow::Result;
    use stackman_config::StackConfig;
    use stackman_platform::Apt;
    use stackman_rollback::{ProtectedOperations, SnapshotStore};
    use stackman_stack::StackManager;
    use stackman_telemetry::AuditLog;
    use stackman_test_support::fixtures::temp_dir;
    use stackman_test_support::mocks::ScriptedRunner;
    use tempfile::TempDir;

    use crate::cli::OutputFormat;
    use crate::context::AppContext;

    pub(crate) fn context(runner: Arc<ScriptedRunner>) -> Result<(TempDir, AppContext)> {
        let temp = temp_dir("cli")?;
        fs::create_dir_all(temp.path().join("sites-available"))?;
        let mut config = StackConfig::defaults()?;
        config.merge_yaml(
            "test",
            &format!(
                "apache:\n  sites_dir: {root}/www\n  vhosts_dir: {root}/sites-available\n",
                root = temp.path().display()
            ),
        )?;
        let protected =
            ProtectedOperations::new(SnapshotStore::open(temp.path().join("backups")));
        let manager = StackManager::new(&config, runner.clone(), protected, AuditLog::disabled())?
            .with_package_manager(Arc::new(Apt::new(runner)));
        Ok((temp, AppContext::new(manager, OutputFormat::Json, true)))
    }
}
