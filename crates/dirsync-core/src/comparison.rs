//! Modification time comparison
//!
//! The modification time is the only change signal: content is never hashed
//! or diffed. Any difference counts, in either direction, because the
//! destination must match the source rather than keep whichever is newer.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{Result, SyncError};

/// Timestamp comparator
pub struct TimestampComparator;

impl TimestampComparator {
    /// Whether two modification times call for a recopy
    #[must_use]
    pub fn differs(source: SystemTime, destination: SystemTime) -> bool {
        source != destination
    }

    /// Get the modification time of a file
    ///
    /// # Errors
    ///
    /// Returns an error if file metadata cannot be read.
    pub fn modified_time(path: &Path) -> Result<SystemTime> {
        let metadata =
            fs::metadata(path).map_err(|e| SyncError::io("read metadata of", path, e))?;

        metadata
            .modified()
            .map_err(|e| SyncError::io("read modification time of", path, e))
    }
}
