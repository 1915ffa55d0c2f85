//! Site plans and generated credentials.

use std::path::PathBuf;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;

/// Length of generated database passwords.
pub const PASSWORD_LENGTH: usize = 16;

/// Everything decided before a site is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitePlan {
    /// Site name, also the vhost `ServerName`.
    pub site: String,
    /// PHP-FPM version the vhost points at.
    pub php_version: String,
    /// Drupal constraint passed to composer, if Drupal is installed.
    pub drupal_version: Option<String>,
    /// `{sites_dir}/{site}`.
    pub doc_root: PathBuf,
    /// Directory Apache serves.
    pub served_root: PathBuf,
    /// `{vhosts_dir}/{site}.conf`.
    pub vhost_file: PathBuf,
    /// Database name.
    pub database: String,
    /// Database user.
    pub db_user: String,
}

/// `example.org` becomes `example_org_db`.
#[must_use]
pub fn database_name(site: &str) -> String {
    format!("{}_db", site.replace('.', "_"))
}

/// `{database}_user`.
#[must_use]
pub fn database_user(database: &str) -> String {
    format!("{database}_user")
}

/// Random alphanumeric password of [`PASSWORD_LENGTH`] characters.
#[must_use]
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Credentials handed to the operator after a site is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteCredentials {
    /// Database name.
    pub database: String,
    /// Database user.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Drupal `admin` account password, when Drupal was installed.
    pub admin_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_names_replace_dots() {
        assert_eq!(database_name("example.org"), "example_org_db");
        assert_eq!(database_user("example_org_db"), "example_org_db_user");
        assert_eq!(database_name("plain"), "plain_db");
    }

    #[test]
    fn passwords_are_alphanumeric_and_fresh() {
        let first = generate_password();
        let second = generate_password();
        assert_eq!(first.len(), PASSWORD_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
