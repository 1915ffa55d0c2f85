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

//! Configuration for stackman: an embedded default YAML document layered
//! with an optional operator file, addressed by dotted keys.
//!
//! Layout: `defaults.rs` (embedded document), `loader.rs` (merge and lookup),
//! `model.rs` (typed sections), `error.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;

pub use defaults::{CONFIG_ENV, DEFAULT_CONFIG_YAML};
pub use error::{ConfigError, ConfigResult};
pub use loader::StackConfig;
pub use model::{
    ApacheSettings, AuditSettings, MysqlSettings, PhpSettings, RollbackSettings,
    SecuritySettings,
};
