//! File operations executor

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::{FileTime, set_file_times};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::actions::SyncAction;
use super::reporting::{ChangeRecord, Operation};
use crate::error::{Result, SyncError};
use crate::scanner::{EntryKind, join_relative};

/// Applies sync actions between a source and a destination root
pub struct FileOperationExecutor {
    source_root: PathBuf,
    dest_root: PathBuf,
    dry_run: bool,
}

impl FileOperationExecutor {
    /// Create a new executor
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            dry_run,
        }
    }

    /// Apply an action and return the record describing it
    ///
    /// `NoOp` yields `None`. Removing something already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a copy or removal fails.
    pub fn apply(&self, action: &SyncAction) -> Result<Option<ChangeRecord>> {
        let relative = action.relative_path();
        let source = join_relative(&self.source_root, relative);
        let dest = join_relative(&self.dest_root, relative);

        let mut record = match action {
            SyncAction::NoOp(_) => return Ok(None),
            SyncAction::CreateFile(_) => {
                if !self.dry_run {
                    Self::copy_file(&source, &dest)?;
                }
                ChangeRecord::now(Operation::Copy, EntryKind::File, source, Some(dest))
            }
            SyncAction::CreateTree(_) => {
                if !self.dry_run {
                    Self::copy_tree(&source, &dest)?;
                }
                ChangeRecord::now(Operation::Copy, EntryKind::Directory, source, Some(dest))
            }
            SyncAction::UpdateFile(_) => {
                if !self.dry_run {
                    Self::copy_file(&source, &dest)?;
                }
                ChangeRecord::now(Operation::Update, EntryKind::File, source, Some(dest))
            }
            SyncAction::RemoveFile(_) => {
                if !self.dry_run {
                    Self::remove_file(&dest)?;
                }
                ChangeRecord::now(Operation::Remove, EntryKind::File, dest, None)
            }
            SyncAction::RemoveTree(_) => {
                if !self.dry_run {
                    Self::remove_tree(&dest)?;
                }
                ChangeRecord::now(Operation::Remove, EntryKind::Directory, dest, None)
            }
        };

        record.dry_run = self.dry_run;
        debug!(action = action.label(), path = %relative.display(), dry_run = self.dry_run, "applied");
        Ok(Some(record))
    }

    /// Copy a file, carrying over permissions and access/modification times
    ///
    /// # Errors
    ///
    /// Returns an error if the copy or the timestamp update fails.
    pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io("create directory", parent, e))?;
        }

        fs::copy(source, dest).map_err(|e| SyncError::io("copy", source, e))?;
        Self::copy_times(source, dest)
    }

    /// Copy a directory tree, preserving file and directory metadata
    ///
    /// Directory permissions and times are applied after all contents are
    /// written, deepest first, so adding children does not disturb them.
    ///
    /// # Errors
    ///
    /// Returns an error if traversal, copying, or a metadata update fails.
    pub fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
        let mut directories = Vec::new();

        for entry in WalkDir::new(source).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.loop_ancestor().is_some() => {
                    // A link back to an ancestor becomes an empty directory,
                    // matching how the scanner lists it.
                    if let Some(path) = e.path() {
                        let relative = path.strip_prefix(source).unwrap_or(path);
                        let target = join_relative(dest, relative);
                        warn!(path = %path.display(), "symlink cycle, copying as empty directory");
                        fs::create_dir_all(&target).map_err(|e| SyncError::io("create directory", &target, e))?;
                    }
                    continue;
                }
                Err(e) => {
                    let path = e.path().unwrap_or(source).to_path_buf();
                    return Err(SyncError::io("walk", path, io::Error::from(e)));
                }
            };
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|_| SyncError::io("walk", entry.path(), io::Error::other("entry outside source tree")))?;
            let target = join_relative(dest, relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| SyncError::io("create directory", &target, e))?;
                directories.push((entry.path().to_path_buf(), target));
            } else {
                Self::copy_file(entry.path(), &target)?;
            }
        }

        for (source_dir, target) in directories.iter().rev() {
            let meta = fs::metadata(source_dir).map_err(|e| SyncError::io("read metadata of", source_dir, e))?;
            fs::set_permissions(target, meta.permissions())
                .map_err(|e| SyncError::io("set permissions of", target, e))?;
            Self::copy_times(source_dir, target)?;
        }

        Ok(())
    }

    /// Delete a single file; a missing file is fine
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove_file(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(SyncError::io("remove file", path, e)),
            _ => Ok(()),
        }
    }

    /// Recursively delete a directory; a missing directory is fine
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn remove_tree(path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(SyncError::io("remove directory", path, e)),
            _ => Ok(()),
        }
    }

    fn copy_times(source: &Path, dest: &Path) -> Result<()> {
        let meta = fs::metadata(source).map_err(|e| SyncError::io("read metadata of", source, e))?;
        set_file_times(
            dest,
            FileTime::from_last_access_time(&meta),
            FileTime::from_last_modification_time(&meta),
        )
        .map_err(|e| SyncError::io("set times of", dest, e))
    }
}
