//! Breadth-first snapshots of a directory tree
//!
//! A snapshot is a flat listing of every file and directory reachable from a
//! root, the root itself first. Directories are expanded in the order they are
//! discovered, so a parent always precedes its descendants. Children are
//! listed in file-name order so that scanning an unchanged tree twice yields
//! the same sequence.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use tracing::{trace, warn};

use crate::error::{Result, SyncError};

/// Join a relative path onto a root, leaving the root untouched for an empty path
#[must_use]
pub fn join_relative(root: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

/// Kind of a tree entry, decided once when the snapshot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    /// Regular file (or a link resolving to one)
    File,
    /// Directory (or a link resolving to one)
    Directory,
}

impl EntryKind {
    /// Human-readable name used in change records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

/// One node discovered under a root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Full path on disk
    pub absolute_path: PathBuf,
    /// Path relative to the snapshot root; empty for the root itself
    pub relative_path: PathBuf,
    /// File or directory
    pub kind: EntryKind,
    /// Modification time, recorded for files only
    pub modified_time: Option<SystemTime>,
}

impl TreeEntry {
    /// Build a file entry
    ///
    /// A file whose modification time is unknown is always recopied.
    #[must_use]
    pub fn file(root: &Path, relative: impl Into<PathBuf>, modified: impl Into<Option<SystemTime>>) -> Self {
        let relative_path = relative.into();
        Self {
            absolute_path: join_relative(root, &relative_path),
            relative_path,
            kind: EntryKind::File,
            modified_time: modified.into(),
        }
    }

    /// Build a directory entry
    #[must_use]
    pub fn directory(root: &Path, relative: impl Into<PathBuf>) -> Self {
        let relative_path = relative.into();
        Self {
            absolute_path: join_relative(root, &relative_path),
            relative_path,
            kind: EntryKind::Directory,
            modified_time: None,
        }
    }

    /// Whether this entry is the snapshot root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative_path.as_os_str().is_empty()
    }
}

/// Ordered listing of one tree, parents before descendants
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    root: PathBuf,
    entries: Vec<TreeEntry>,
    warnings: Vec<String>,
}

impl TreeSnapshot {
    /// Build a snapshot from already known entries
    #[must_use]
    pub fn from_entries(root: impl Into<PathBuf>, entries: Vec<TreeEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
            warnings: Vec::new(),
        }
    }

    /// Root the snapshot was taken from
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entries in traversal order
    pub fn iter(&self) -> std::slice::Iter<'_, TreeEntry> {
        self.entries.iter()
    }

    /// Number of entries, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by relative path
    #[must_use]
    pub fn get(&self, relative: &Path) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.relative_path == relative)
    }

    /// Relative paths in traversal order
    pub fn relative_paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.relative_path.as_path())
    }

    /// Non-fatal problems encountered while scanning
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Index the entries by relative path for repeated lookups
    #[must_use]
    pub fn index(&self) -> SnapshotIndex<'_> {
        SnapshotIndex {
            kinds: self
                .entries
                .iter()
                .map(|e| (e.relative_path.as_path(), e.kind))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TreeSnapshot {
    type Item = &'a TreeEntry;
    type IntoIter = std::slice::Iter<'a, TreeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Relative path and kind lookup over a snapshot
#[derive(Debug)]
pub struct SnapshotIndex<'a> {
    kinds: HashMap<&'a Path, EntryKind>,
}

impl SnapshotIndex<'_> {
    /// Whether an entry with this relative path and kind was listed
    #[must_use]
    pub fn contains(&self, relative: &Path, kind: EntryKind) -> bool {
        self.kinds.get(relative) == Some(&kind)
    }
}

/// Snapshot builder
pub struct Scanner;

impl Scanner {
    /// Take a breadth-first snapshot of `root`
    ///
    /// Symbolic links are followed. A directory whose canonical path is one of
    /// its own ancestors is listed but not expanded, so link cycles terminate
    /// while a second link to an already listed directory is still expanded.
    /// Entries that disappear while the scan runs, and dangling links, are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be read or a directory listing fails.
    pub fn snapshot(root: &Path) -> Result<TreeSnapshot> {
        let root_meta = fs::metadata(root).map_err(|e| SyncError::io("read metadata of", root, e))?;

        let mut snapshot = TreeSnapshot::from_entries(root, Vec::new());
        let root_entry = Self::entry_from_metadata(root, PathBuf::new(), &root_meta, &mut snapshot.warnings);

        // Each queued directory carries the canonical paths of its ancestors.
        let mut queue: VecDeque<(usize, Rc<[PathBuf]>)> = VecDeque::new();
        if root_entry.kind == EntryKind::Directory {
            queue.push_back((0, Rc::from(Vec::new())));
        }
        snapshot.entries.push(root_entry);

        while let Some((index, ancestors)) = queue.pop_front() {
            let dir = snapshot.entries[index].absolute_path.clone();
            let dir_relative = snapshot.entries[index].relative_path.clone();

            let canonical = match dunce::canonicalize(&dir) {
                Ok(canonical) => canonical,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    snapshot.warnings.push(format!("directory vanished during scan: {}", dir.display()));
                    continue;
                }
                Err(e) => return Err(SyncError::io("resolve", dir, e)),
            };
            if ancestors.contains(&canonical) {
                let msg = format!("symlink cycle, not descending into {}", dir.display());
                warn!("{msg}");
                snapshot.warnings.push(msg);
                continue;
            }
            let chain: Rc<[PathBuf]> = ancestors.iter().cloned().chain([canonical]).collect();

            for child in Self::read_children(&dir)? {
                let Some(name) = child.file_name() else {
                    continue;
                };
                let relative = dir_relative.join(name);

                let meta = match fs::metadata(&child) {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        let msg = if fs::symlink_metadata(&child).is_ok() {
                            format!("skipping dangling symlink: {}", child.display())
                        } else {
                            format!("entry vanished during scan: {}", child.display())
                        };
                        warn!("{msg}");
                        snapshot.warnings.push(msg);
                        continue;
                    }
                    Err(e) => return Err(SyncError::io("read metadata of", child, e)),
                };

                let entry = Self::entry_from_metadata(root, relative, &meta, &mut snapshot.warnings);
                trace!(path = %entry.relative_path.display(), kind = entry.kind.as_str(), "listed");
                if entry.kind == EntryKind::Directory {
                    queue.push_back((snapshot.entries.len(), Rc::clone(&chain)));
                }
                snapshot.entries.push(entry);
            }
        }

        Ok(snapshot)
    }

    /// Immediate children of `dir`, sorted by file name
    fn read_children(dir: &Path) -> Result<Vec<PathBuf>> {
        let read = fs::read_dir(dir).map_err(|e| SyncError::io("read directory", dir, e))?;
        let mut children = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| SyncError::io("read entry in", dir, e))?;
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }

    fn entry_from_metadata(
        root: &Path,
        relative: PathBuf,
        meta: &fs::Metadata,
        warnings: &mut Vec<String>,
    ) -> TreeEntry {
        if meta.is_dir() {
            return TreeEntry::directory(root, relative);
        }

        let modified = match meta.modified() {
            Ok(modified) => Some(modified),
            Err(e) => {
                let msg = format!(
                    "modification time unavailable, file will be recopied every pass: {} ({e})",
                    join_relative(root, &relative).display()
                );
                warn!("{msg}");
                warnings.push(msg);
                None
            }
        };
        TreeEntry::file(root, relative, modified)
    }
}
