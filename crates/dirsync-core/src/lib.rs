//! # dirsync-core
//!
//! Core library for one-way directory mirroring.
//!
//! The destination tree is reshaped to match the source tree exactly: entries
//! only present in the destination are removed, entries missing from it are
//! copied, and files whose modification time differs are recopied. Every
//! applied change is handed to a [`ChangeSink`](sync::ChangeSink).

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types for the dirsync library
pub mod error;

/// Tree snapshots (breadth-first listings of a directory tree)
pub mod scanner;

/// Modification time comparison
pub mod comparison;

/// Sync roots and their validation
pub mod config;

/// Reconciliation engine
pub mod sync;

pub use config::SyncConfig;
pub use error::{ConfigurationError, Result, SyncError};
pub use sync::{ChangeRecord, ChangeSink, LogReporter, SyncAction, SyncEngine, SyncResult};
