use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`SyncError`]
pub type Result<T> = std::result::Result<T, SyncError>;

/// Problems with the sync roots that make a pass impossible.
///
/// These are never retried: the caller must stop and report them.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Source root does not exist
    #[error("source path does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    /// Source root is not a directory
    #[error("source path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    /// Destination root exists but cannot host a tree
    #[error("destination path is a file, it must be a directory: {}", .0.display())]
    DestinationIsFile(PathBuf),

    /// One root lies inside the other
    #[error("source and destination must not be nested: {} and {}", source_root.display(), dest_root.display())]
    NestedRoots {
        /// Resolved source root
        source_root: PathBuf,
        /// Resolved destination root
        dest_root: PathBuf,
    },

    /// A root could not be resolved to an absolute path
    #[error("failed to resolve path {}: {source}", path.display())]
    Unresolvable {
        /// Path as given
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Errors raised by a synchronization pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fatal configuration problem, detected before any mutation
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Filesystem operation failed; aborts the current pass
    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        /// What was being attempted
        operation: &'static str,
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Change record could not be written to the log sink
    #[error("failed to write change log {}: {source}", path.display())]
    Report {
        /// Log destination
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Build an I/O error for `operation` on `path`
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the error must stop all further passes
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
