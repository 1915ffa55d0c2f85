use std::fs;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use stackman_telemetry::{AUDIT_FILE_NAME, AuditLog};
use stackman_test_support::fixtures::{temp_dir, write_file};

#[test]
fn entries_are_appended_as_json_lines() -> Result<()> {
    let temp = temp_dir("telemetry-audit")?;
    let dir = temp.path().join("logs").join("stackman");
    let log = AuditLog::open(&dir).with_user("deploy");

    log.record("create_site", "example.org", json!({"php_version": "8.4"}));
    log.record("switch_php", "example.org", json!({"from": "8.3", "to": "8.4"}));

    let content = fs::read_to_string(dir.join(AUDIT_FILE_NAME))?;
    let entries = content
        .lines()
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "create_site");
    assert_eq!(entries[0]["target"], "example.org");
    assert_eq!(entries[0]["user"], "deploy");
    assert_eq!(entries[0]["details"]["php_version"], "8.4");
    assert_eq!(entries[1]["details"]["to"], "8.4");

    let timestamp = entries[0]["timestamp"]
        .as_str()
        .context("timestamp is a string")?;
    assert!(timestamp.ends_with('Z'));
    chrono::DateTime::parse_from_rfc3339(timestamp)?;
    Ok(())
}

#[test]
fn unusable_directory_degrades_without_failing() -> Result<()> {
    let temp = temp_dir("telemetry-audit")?;
    let blocker = write_file(temp.path(), "blocker", "not a directory")?;

    let log = AuditLog::open(blocker.join("audit"));
    assert!(log.path().is_none());
    log.record("install", "apache", Value::Null);
    assert_eq!(fs::read_to_string(&blocker)?, "not a directory");
    Ok(())
}
