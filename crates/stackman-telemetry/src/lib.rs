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

//! Observability for stackman: the global tracing subscriber and the
//! append-only audit trail of administrative actions.
//!
//! Layout: `init.rs` (subscriber setup), `audit.rs` (JSON-line audit log),
//! `error.rs`.

pub mod audit;
pub mod error;
pub mod init;

pub use audit::{AUDIT_FILE_NAME, AuditEntry, AuditLog, current_user};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging, log_level};
