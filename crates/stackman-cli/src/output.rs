//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use stackman_rollback::{ArtifactInfo, EvictionSummary};
use stackman_stack::{InstallReport, PhpSwitchReport, SiteEntry, SiteReport, StackStatus};

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

const fn plan_prefix(applied: bool) -> &'static str {
    if applied { "" } else { "[dry-run] " }
}

pub(crate) fn render_install(report: &InstallReport, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    let mut text = String::new();
    let prefix = plan_prefix(report.applied);
    for step in &report.steps {
        let _ = writeln!(
            text,
            "{prefix}{:<8} {}",
            step.component.as_str(),
            step.packages.join(" ")
        );
    }
    if report.applied {
        if report.installed.is_empty() {
            text.push_str("All packages already installed.\n");
        } else {
            let _ = writeln!(text, "Installed: {}", report.installed.join(", "));
        }
    }
    Ok(text)
}

pub(crate) fn render_site(report: &SiteReport, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    let plan = &report.plan;
    let prefix = plan_prefix(report.applied);
    let mut text = String::new();
    let _ = writeln!(text, "{prefix}site: {}", plan.site);
    let _ = writeln!(text, "{prefix}document root: {}", plan.served_root.display());
    let _ = writeln!(text, "{prefix}vhost: {}", plan.vhost_file.display());
    let _ = writeln!(text, "{prefix}php: {}", plan.php_version);
    if let Some(drupal) = &plan.drupal_version {
        let _ = writeln!(text, "{prefix}drupal: {drupal}");
    }
    let _ = writeln!(text, "{prefix}database: {} (user {})", plan.database, plan.db_user);
    if let Some(credentials) = &report.credentials {
        let _ = writeln!(text, "database password: {}", credentials.password);
        if let Some(admin) = &credentials.admin_password {
            let _ = writeln!(text, "drupal admin password: {admin}");
        }
        text.push_str("Store these credentials now; they are not saved anywhere.\n");
    }
    Ok(text)
}

pub(crate) fn render_sites(sites: &[SiteEntry], format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return to_json(sites);
    }
    if sites.is_empty() {
        return Ok("No sites configured.\n".to_string());
    }
    let width = sites
        .iter()
        .map(|site| site.name.len())
        .max()
        .unwrap_or_default()
        .max(4);
    let mut text = format!("{:<width$} CONFIG\n", "SITE");
    for site in sites {
        let _ = writeln!(text, "{:<width$} {}", site.name, site.config_file.display());
    }
    Ok(text)
}

pub(crate) fn render_php_switch(report: &PhpSwitchReport, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    Ok(format!(
        "{}{}: PHP {} -> {} ({})\n",
        plan_prefix(report.applied),
        report.site,
        report.previous_version,
        report.php_version,
        report.vhost_file.display()
    ))
}

pub(crate) fn render_status(status: &StackStatus, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return to_json(status);
    }
    let mut text = String::new();
    let _ = writeln!(text, "apache ({}): {}", status.apache.name, status.apache.state);
    let _ = writeln!(text, "mysql ({}): {}", status.mysql.name, status.mysql.state);
    let _ = writeln!(text, "sites dir: {}", status.sites_dir.display());
    let _ = writeln!(text, "vhosts dir: {}", status.vhosts_dir.display());
    let _ = writeln!(
        text,
        "backup dir: {} ({})",
        status.backup_dir.display(),
        if status.rollback_protected {
            "rollback enabled"
        } else {
            "UNAVAILABLE, rollback disabled"
        }
    );
    Ok(text)
}

pub(crate) fn render_snapshots(
    artifacts: &[ArtifactInfo],
    now: DateTime<Utc>,
    format: OutputFormat,
) -> CliResult<String> {
    if format == OutputFormat::Json {
        return to_json(artifacts);
    }
    if artifacts.is_empty() {
        return Ok("No snapshots.\n".to_string());
    }
    let mut text = format!("{:>8} {:>10} {:<4} NAME\n", "AGE", "SIZE", "KIND");
    for artifact in artifacts {
        let _ = writeln!(
            text,
            "{:>8} {:>10} {:<4} {}",
            format_age(artifact.modified, now),
            format_bytes(artifact.size_bytes),
            if artifact.is_dir { "dir" } else { "file" },
            artifact.name
        );
    }
    Ok(text)
}

pub(crate) fn render_prune(
    summary: &EvictionSummary,
    days: u64,
    format: OutputFormat,
) -> CliResult<String> {
    if format == OutputFormat::Json {
        return to_json(summary);
    }
    let mut text = format!(
        "Removed {} of {} snapshot(s) older than {days} day(s).\n",
        summary.removed, summary.examined
    );
    if summary.failed > 0 {
        let _ = writeln!(text, "{} snapshot(s) could not be removed; see logs.", summary.failed);
    }
    Ok(text)
}

#[must_use]
pub(crate) fn format_age(modified: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(modified);
    if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m", elapsed.num_minutes())
    } else {
        "now".to_string()
    }
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::{Duration, TimeZone};
    use stackman_stack::{Component, InstallStep};
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn formats_bytes_and_ages() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
        assert_eq!(format_age(now() - Duration::days(8), now()), "8d");
        assert_eq!(format_age(now() - Duration::hours(5), now()), "5h");
        assert_eq!(format_age(now() - Duration::seconds(10), now()), "now");
    }

    #[test]
    fn snapshot_table_lists_age_size_and_kind() -> Result<()> {
        let artifacts = vec![ArtifactInfo {
            name: "switch_php_20240530_120000_example.org.conf".into(),
            path: PathBuf::from("/var/backups/stackman/switch_php_20240530_120000_example.org.conf"),
            modified: now() - Duration::days(2),
            size_bytes: 2048,
            is_dir: false,
        }];
        let text = render_snapshots(&artifacts, now(), OutputFormat::Table)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        let row = text.lines().nth(1).unwrap_or_default();
        assert!(row.contains("2d"));
        assert!(row.contains("2.00 KiB"));
        assert!(row.contains("file"));
        assert!(row.ends_with("switch_php_20240530_120000_example.org.conf"));
        Ok(())
    }

    #[test]
    fn dry_run_install_is_marked() -> Result<()> {
        let report = InstallReport {
            steps: vec![InstallStep {
                component: Component::Mysql,
                packages: vec!["mysql-server".into()],
            }],
            installed: Vec::new(),
            applied: false,
        };
        let text = render_install(&report, OutputFormat::Table)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        assert_eq!(text, "[dry-run] mysql    mysql-server\n");

        let json = render_install(&report, OutputFormat::Json)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value["steps"][0]["component"], "mysql");
        assert_eq!(value["applied"], false);
        Ok(())
    }

    #[test]
    fn empty_site_list_has_a_message() -> Result<()> {
        let text = render_sites(&[], OutputFormat::Table)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        assert_eq!(text, "No sites configured.\n");
        let entries = [SiteEntry {
            name: "example.org".into(),
            config_file: PathBuf::from("/etc/apache2/sites-available/example.org.conf"),
        }];
        let text = render_sites(&entries, OutputFormat::Table)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        assert!(text.starts_with("SITE        CONFIG\n"));
        Ok(())
    }
}
