//! Drupal core provisioning through composer and drush.

use std::path::Path;

use stackman_platform::{CommandRunner, CommandSpec};
use tracing::info;

use crate::error::{StackError, StackResult};
use crate::mysql::DB_USER_HOST;
use crate::site::{SitePlan, generate_password};

/// Install Drupal `version` into the plan's document root and run the site
/// installer against the site database. Steps already done (an existing
/// `composer.json` or `settings.php`) are skipped.
///
/// Returns the generated `admin` password when the installer ran.
pub(crate) fn install_drupal(
    runner: &dyn CommandRunner,
    plan: &SitePlan,
    version: &str,
    db_password: &str,
) -> StackResult<Option<String>> {
    let doc_root = &plan.doc_root;
    if !doc_root.join("composer.json").exists() {
        info!(site = %plan.site, version, "creating drupal project");
        runner
            .run_checked(
                &CommandSpec::new("composer")
                    .arg("create-project")
                    .arg(format!("drupal/recommended-project:{version}"))
                    .arg(path_arg(doc_root))
                    .arg("--no-interaction"),
            )
            .map_err(StackError::platform("drupal.create_project"))?;
    }

    let web = doc_root.join("web");
    if web.join("sites").join("default").join("settings.php").exists() {
        info!(site = %plan.site, "drupal already installed");
        return Ok(None);
    }

    let admin_password = generate_password();
    let drush = doc_root.join("vendor").join("bin").join("drush");
    info!(site = %plan.site, "running drupal site installer");
    runner
        .run_checked(
            &CommandSpec::new("php")
                .arg(path_arg(&drush))
                .arg("site:install")
                .secret_arg(format!(
                    "--db-url=mysql://{}:{db_password}@{DB_USER_HOST}/{}",
                    plan.db_user, plan.database
                ))
                .arg("--account-name=admin")
                .secret_arg(format!("--account-pass={admin_password}"))
                .arg(format!("--site-name={}", plan.site))
                .arg("-y")
                .current_dir(web),
        )
        .map_err(StackError::platform("drupal.site_install"))?;
    Ok(Some(admin_password))
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}
