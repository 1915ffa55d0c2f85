//! Apache virtual host rendering and PHP handler rewriting.

use std::path::Path;

use regex::Regex;

use crate::error::{StackError, StackResult};

const HANDLER_PATTERN: &str =
    r#"(SetHandler "proxy:unix:/var/run/php/php)(\d+\.\d+)(-fpm\.sock\|fcgi://localhost/")"#;

/// PHP-FPM socket for `version`.
#[must_use]
pub fn fpm_socket(version: &str) -> String {
    format!("/var/run/php/php{version}-fpm.sock")
}

/// Render the virtual host for `site` serving `served_root` through PHP-FPM
/// `php_version`.
#[must_use]
pub fn render_vhost(site: &str, served_root: &Path, php_version: &str) -> String {
    let root = served_root.display();
    let socket = fpm_socket(php_version);
    format!(
        r#"<VirtualHost *:80>
    ServerName {site}
    DocumentRoot {root}

    <Directory {root}>
        AllowOverride All
        Require all granted
    </Directory>

    <FilesMatch \.php$>
        SetHandler "proxy:unix:{socket}|fcgi://localhost/"
    </FilesMatch>

    ErrorLog ${{APACHE_LOG_DIR}}/{site}_error.log
    CustomLog ${{APACHE_LOG_DIR}}/{site}_access.log combined
</VirtualHost>
"#
    )
}

/// Result of pointing every PHP-FPM handler in a vhost at a new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRewrite {
    /// Updated vhost content.
    pub content: String,
    /// Version found in the first handler directive.
    pub previous_version: String,
    /// Number of directives rewritten.
    pub replaced: usize,
}

/// Rewrite every PHP-FPM `SetHandler` directive in `content` to `version`.
///
/// Returns `Ok(None)` when no directive is present.
///
/// # Errors
///
/// Returns an error only if the built-in pattern fails to compile.
pub fn rewrite_php_handler(content: &str, version: &str) -> StackResult<Option<HandlerRewrite>> {
    let pattern = Regex::new(HANDLER_PATTERN).map_err(|source| StackError::RegexCompile {
        pattern: HANDLER_PATTERN,
        source,
    })?;
    let Some(first) = pattern.captures(content) else {
        return Ok(None);
    };
    let previous_version = first[2].to_string();
    let replaced = pattern.find_iter(content).count();
    let content = pattern
        .replace_all(content, |caps: &regex::Captures<'_>| {
            format!("{}{version}{}", &caps[1], &caps[3])
        })
        .into_owned();
    Ok(Some(HandlerRewrite {
        content,
        previous_version,
        replaced,
    }))
}
