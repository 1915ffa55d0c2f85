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

//! Snapshot-before, restore-on-failure protection for filesystem mutations.
//!
//! Layout: `store.rs` (`SnapshotStore`: copy, restore, eviction, listing),
//! `controller.rs` (`ProtectedOperations::run_protected`), `model/` (records
//! and reports), `clock.rs` (injectable time source), `error.rs`.
//!
//! At most one protected operation may run against a store at a time. There is
//! no locking; callers serialize operations themselves.

pub mod clock;
pub mod controller;
pub mod error;
pub mod model;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{DEFAULT_RETENTION_DAYS, ProtectedOperations, ProtectionMode};
pub use error::{ProtectedError, RollbackError, RollbackResult};
pub use model::{
    ArtifactInfo, EvictionSummary, OperationId, RestoreFailure, RollbackReport, Snapshot,
    SnapshotKind,
};
pub use store::SnapshotStore;
