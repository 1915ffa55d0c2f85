//! Filesystem fixtures for tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Create a temporary directory named `stackman-{prefix}-*`.
///
/// # Errors
///
/// Returns an error when the directory cannot be created.
pub fn temp_dir(prefix: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("stackman-{prefix}-"))
        .tempdir()
        .context("failed to create temporary directory")
}

/// Write `content` to `root/relative`, creating parent directories.
///
/// # Errors
///
/// Returns an error when a directory or the file cannot be written.
pub fn write_file(root: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_uses_stackman_prefix() -> Result<()> {
        let dir = temp_dir("fixtures")?;
        let name = dir
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        assert!(name.starts_with("stackman-fixtures-"));
        Ok(())
    }

    #[test]
    fn write_file_creates_parents() -> Result<()> {
        let dir = temp_dir("fixtures")?;
        let path = write_file(dir.path(), "a/b/c.txt", "hello")?;
        assert_eq!(fs::read_to_string(path)?, "hello");
        Ok(())
    }
}
