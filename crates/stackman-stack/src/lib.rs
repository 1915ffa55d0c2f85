#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Linux web stack management: Apache, MySQL, and PHP-FPM sites whose
//! filesystem changes are snapshotted and rolled back on failure.
//!
//! Layout: `manager.rs` (`StackManager` operations), `apache.rs`,
//! `mysql.rs`, `php.rs` (per-service managers), `vhost.rs` (templates and
//! handler rewriting), `site.rs` (plans and credentials), `drupal.rs`
//! (composer/drush provisioning), `validate.rs` (pre-flight checks),
//! `error.rs`.

pub mod apache;
mod drupal;
pub mod error;
pub mod manager;
pub mod mysql;
pub mod php;
pub mod site;
pub mod validate;
pub mod vhost;

pub use apache::{ApacheManager, SiteEntry};
pub use error::{StackError, StackResult};
pub use manager::{
    Component, InstallReport, InstallStep, PhpSwitchReport, SiteReport, StackManager, StackStatus,
};
pub use mysql::MysqlManager;
pub use php::PhpManager;
pub use site::{SiteCredentials, SitePlan, database_name, generate_password};
pub use validate::{
    HostProbe, SystemProbe, is_valid_site_name, validate_prerequisites, validate_site_config,
    validate_site_name,
};
pub use vhost::{HandlerRewrite, render_vhost, rewrite_php_handler};
