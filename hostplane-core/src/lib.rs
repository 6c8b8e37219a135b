//! # hostplane-core
//!
//! Configuration resolution for the host dataplane agent.
//!
//! ```text
//! sources ─► merge (precedence) ─► coerce ─► validate ─► snapshot + changes
//! ```
//!
//! [`ConfigEngine`] runs one pass at a time and publishes immutable
//! [`Snapshot`]s; [`Driver`] decides when passes run.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod driver;
pub mod engine;
mod error;
pub mod merge;
pub mod resolve;
pub mod snapshot;
pub mod subscription;
pub mod watcher;

pub use config::EngineConfig;
pub use driver::{Driver, DriverHandle, Trigger};
pub use engine::{ConfigEngine, ConfigUpdate, EngineOptions, PassOutcome};
pub use error::EngineError;
pub use merge::{merge, MergedEntry, MergedRawMap, UnknownKey};
pub use resolve::{
    resolve_all, Diagnostic, DiagnosticKind, Outcome, PassReport, ResolvedValue, SourceFailure,
};
pub use snapshot::{build, ChangeRecord, FirstPassPolicy, Snapshot};
pub use subscription::Subscription;
pub use watcher::FileWatcher;
