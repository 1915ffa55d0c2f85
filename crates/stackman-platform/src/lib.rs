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

//! Host integration: external command execution, distribution detection,
//! package managers, and init-system service control.
//!
//! Layout: `command.rs` (`CommandRunner` and runners), `distro.rs`
//! (`/etc/os-release` detection), `package.rs` (apt/yum), `service.rs`
//! (systemctl), `error.rs`.

pub mod command;
pub mod distro;
pub mod error;
pub mod package;
pub mod service;

pub use command::{CommandOutput, CommandRunner, CommandSpec, DryRunRunner, SystemRunner};
pub use distro::{
    DEFAULT_OS_RELEASE, PackageManagerKind, detect_package_manager, package_manager_kind,
    parse_os_release_id,
};
pub use error::{PlatformError, PlatformResult};
pub use package::{Apt, PackageManager, Yum, package_manager_for};
pub use service::{ServiceAction, ServiceController, ServiceStatus};
