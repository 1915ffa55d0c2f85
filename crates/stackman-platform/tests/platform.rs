use std::fs;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use stackman_platform::{
    Apt, CommandOutput, DryRunRunner, PackageManager, PackageManagerKind, PlatformError, ServiceAction,
    ServiceController, Yum, detect_package_manager, package_manager_for,
};
use stackman_test_support::fixtures::{temp_dir, write_file};
use stackman_test_support::mocks::ScriptedRunner;

#[test]
fn detects_package_manager_from_os_release_file() -> Result<()> {
    let temp = temp_dir("platform-distro")?;
    let debian = write_file(temp.path(), "debian", "PRETTY_NAME=\"Debian 12\"\nID=debian\n")?;
    let centos = write_file(temp.path(), "centos", "ID=\"centos\"\nVERSION_ID=\"9\"\n")?;
    let alpine = write_file(temp.path(), "alpine", "ID=alpine\n")?;

    assert_eq!(detect_package_manager(&debian)?, PackageManagerKind::Apt);
    assert_eq!(detect_package_manager(&centos)?, PackageManagerKind::Yum);
    assert!(matches!(
        detect_package_manager(&alpine),
        Err(PlatformError::UnsupportedDistribution { id }) if id == "alpine"
    ));
    assert!(matches!(
        detect_package_manager(&temp.path().join("missing")),
        Err(PlatformError::OsRelease { .. })
    ));
    Ok(())
}

#[test]
fn apt_installs_only_missing_packages() -> Result<()> {
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(
                "dpkg -l apache2",
                CommandOutput::ok("ii  apache2  2.4.58  amd64  Apache HTTP Server\n"),
            )
            .fail("dpkg -l mysql-server", "no packages found matching mysql-server"),
    );
    let apt = Apt::new(runner.clone());

    let installed = apt.ensure_installed(&["apache2".into(), "mysql-server".into()])?;

    assert_eq!(installed, vec!["mysql-server".to_string()]);
    assert_eq!(
        runner.calls(),
        vec![
            "dpkg -l apache2",
            "dpkg -l mysql-server",
            "apt-get install -y mysql-server",
        ]
    );
    Ok(())
}

#[test]
fn apt_add_repository_refreshes_metadata() -> Result<()> {
    let runner = Arc::new(ScriptedRunner::new());
    Apt::new(runner.clone()).add_repository("ppa:ondrej/php")?;
    assert_eq!(
        runner.calls(),
        vec![
            "dpkg -l software-properties-common",
            "apt-get install -y software-properties-common",
            "add-apt-repository -y ppa:ondrej/php",
            "apt-get update",
        ]
    );
    Ok(())
}

#[test]
fn apt_install_failure_carries_stderr() -> Result<()> {
    let runner = Arc::new(ScriptedRunner::new().fail("apt-get install", "E: Unable to locate package"));
    let err = Apt::new(runner)
        .install(&["nope".into()])
        .err()
        .ok_or_else(|| anyhow!("install should fail"))?;
    assert!(matches!(
        err,
        PlatformError::CommandFailed { ref stderr, .. } if stderr == "E: Unable to locate package"
    ));
    Ok(())
}

#[test]
fn yum_check_update_treats_pending_updates_as_success() -> Result<()> {
    let pending = Arc::new(ScriptedRunner::new().respond("yum check-update", CommandOutput::failed(100, "")));
    Yum::new(pending).update_cache()?;

    let broken = Arc::new(ScriptedRunner::new().fail("yum check-update", "repo down"));
    assert!(Yum::new(broken).update_cache().is_err());
    Ok(())
}

#[test]
fn yum_queries_with_rpm() -> Result<()> {
    let runner = Arc::new(ScriptedRunner::new().fail("rpm -q php", "package php is not installed"));
    let yum = package_manager_for(PackageManagerKind::Yum, runner.clone());
    assert_eq!(yum.kind(), PackageManagerKind::Yum);
    assert!(yum.is_installed("httpd")?);
    assert!(!yum.is_installed("php")?);
    assert_eq!(runner.calls(), vec!["rpm -q httpd", "rpm -q php"]);
    Ok(())
}

#[test]
fn service_controller_runs_systemctl() -> Result<()> {
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond("systemctl is-active apache2", CommandOutput::ok("active\n"))
            .respond(
                "systemctl is-active mysql",
                CommandOutput {
                    status: Some(3),
                    stdout: "inactive\n".into(),
                    stderr: String::new(),
                },
            ),
    );
    let services = ServiceController::new(runner.clone());

    services.manage("apache2", ServiceAction::Reload)?;
    let apache = services.query("apache2")?;
    let mysql = services.query("mysql")?;

    assert!(apache.is_active());
    assert_eq!(mysql.state, "inactive");
    assert!(!mysql.is_active());
    assert!(!services.is_active("mysql")?);
    assert_eq!(runner.calls()[0], "systemctl reload apache2");
    Ok(())
}

#[test]
fn service_status_is_unknown_without_systemctl() -> Result<()> {
    let runner = Arc::new(ScriptedRunner::new().missing_program("systemctl"));
    let status = ServiceController::new(runner).query("apache2")?;
    assert_eq!(status.state, "unknown");
    Ok(())
}

#[test]
fn dry_run_leaves_files_untouched() -> Result<()> {
    let temp = temp_dir("platform-dry-run")?;
    let apt = Apt::new(Arc::new(DryRunRunner));
    apt.install(&["apache2".into()])?;
    apt.update_cache()?;
    assert!(fs::read_dir(temp.path())?.next().is_none());
    Ok(())
}
