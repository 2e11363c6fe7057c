//! Sync roots and their validation
//!
//! Both roots are absolute and resolved before a pass runs. Validation is
//! repeated at the start of every pass because the destination may have been
//! replaced since the previous one.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

/// Explicit configuration for one source/destination pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Authoritative tree
    pub source_root: PathBuf,
    /// Tree reshaped to mirror the source
    pub dest_root: PathBuf,
    /// Report decisions without touching the destination
    pub dry_run: bool,
}

impl SyncConfig {
    /// Create a configuration from already resolved roots
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            dry_run: false,
        }
    }

    /// Resolve both roots to absolute paths and build a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if either path cannot be made absolute.
    pub fn resolve(source: &Path, dest: &Path) -> Result<Self, ConfigurationError> {
        Ok(Self::new(resolve_path(source)?, resolve_path(dest)?))
    }

    /// Toggle dry-run mode
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check the roots can host a mirror
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or not a directory, the
    /// destination is a file, or one root is nested inside the other.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.source_root.exists() {
            return Err(ConfigurationError::SourceMissing(self.source_root.clone()));
        }
        if !self.source_root.is_dir() {
            return Err(ConfigurationError::SourceNotDirectory(self.source_root.clone()));
        }
        if self.dest_root.exists() && !self.dest_root.is_dir() {
            return Err(ConfigurationError::DestinationIsFile(self.dest_root.clone()));
        }
        if self.dest_root.starts_with(&self.source_root) || self.source_root.starts_with(&self.dest_root) {
            return Err(ConfigurationError::NestedRoots {
                source_root: self.source_root.clone(),
                dest_root: self.dest_root.clone(),
            });
        }
        Ok(())
    }
}

/// Resolve `path` to an absolute path without requiring it to exist
///
/// Existing paths are canonicalized. For a missing path the nearest existing
/// ancestor is canonicalized and the remaining components appended.
///
/// # Errors
///
/// Returns an error if the current directory is unavailable or an existing
/// ancestor cannot be canonicalized.
pub fn resolve_path(path: &Path) -> Result<PathBuf, ConfigurationError> {
    let unresolvable = |source: io::Error| ConfigurationError::Unresolvable {
        path: path.to_path_buf(),
        source,
    };

    let absolute = std::path::absolute(path).map_err(unresolvable)?;

    let mut existing = absolute.clone();
    let mut missing = Vec::new();
    while !existing.exists() {
        let Some(last) = existing.components().next_back() else {
            return Ok(absolute);
        };
        missing.push(last.as_os_str().to_os_string());
        if !existing.pop() {
            return Ok(absolute);
        }
    }

    let mut resolved = dunce::canonicalize(&existing).map_err(unresolvable)?;
    for name in missing.iter().rev() {
        if name == ".." {
            resolved.pop();
        } else if name != "." {
            resolved.push(name);
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn roots(tmp: &TempDir) -> (PathBuf, PathBuf) {
        let base = dunce::canonicalize(tmp.path()).unwrap();
        (base.join("src"), base.join("dst"))
    }

    #[test]
    fn test_validate_accepts_missing_destination() {
        let tmp = TempDir::new().unwrap();
        let (src, dst) = roots(&tmp);
        fs::create_dir(&src).unwrap();

        assert!(SyncConfig::new(&src, &dst).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_source() {
        let tmp = TempDir::new().unwrap();
        let (src, dst) = roots(&tmp);

        let err = SyncConfig::new(&src, &dst).validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::SourceMissing(_)));
    }

    #[test]
    fn test_validate_rejects_file_source() {
        let tmp = TempDir::new().unwrap();
        let (src, dst) = roots(&tmp);
        fs::write(&src, "not a dir").unwrap();

        let err = SyncConfig::new(&src, &dst).validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::SourceNotDirectory(_)));
    }

    #[test]
    fn test_validate_rejects_file_destination() {
        let tmp = TempDir::new().unwrap();
        let (src, dst) = roots(&tmp);
        fs::create_dir(&src).unwrap();
        fs::write(&dst, "occupied").unwrap();

        let err = SyncConfig::new(&src, &dst).validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::DestinationIsFile(_)));
    }

    #[test]
    fn test_validate_rejects_nested_roots() {
        let tmp = TempDir::new().unwrap();
        let (src, _) = roots(&tmp);
        fs::create_dir(&src).unwrap();

        let inside = SyncConfig::new(&src, src.join("mirror")).validate();
        assert!(matches!(inside, Err(ConfigurationError::NestedRoots { .. })));

        let outside = SyncConfig::new(&src, src.parent().unwrap()).validate();
        assert!(matches!(outside, Err(ConfigurationError::NestedRoots { .. })));

        let same = SyncConfig::new(&src, &src).validate();
        assert!(matches!(same, Err(ConfigurationError::NestedRoots { .. })));
    }

    #[test]
    fn test_sibling_with_common_prefix_is_not_nested() {
        let tmp = TempDir::new().unwrap();
        let (src, _) = roots(&tmp);
        fs::create_dir(&src).unwrap();
        let sibling = src.with_file_name("src-backup");

        assert!(SyncConfig::new(&src, &sibling).validate().is_ok());
    }

    #[test]
    fn test_resolve_missing_path_through_existing_ancestor() {
        let tmp = TempDir::new().unwrap();
        let base = dunce::canonicalize(tmp.path()).unwrap();

        let resolved = resolve_path(&tmp.path().join("a/b/../c")).unwrap();

        assert_eq!(resolved, base.join("a").join("c"));
    }

    #[test]
    fn test_resolve_existing_path_is_canonical() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("real")).unwrap();

        let resolved = resolve_path(&tmp.path().join("real/../real")).unwrap();

        assert_eq!(resolved, dunce::canonicalize(tmp.path().join("real")).unwrap());
    }
}
