//! Sync action determination logic
//!
//! The planner is pure: it decides from snapshot entries and from the live
//! state of the counterpart, which the orchestrator looks up. Nothing here
//! touches the filesystem.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use crate::comparison::TimestampComparator;
use crate::scanner::{EntryKind, SnapshotIndex, TreeEntry};

/// Decision for one relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy a file missing from the destination
    CreateFile(PathBuf),
    /// Copy a whole directory subtree missing from the destination
    CreateTree(PathBuf),
    /// Recopy a file whose modification time differs
    UpdateFile(PathBuf),
    /// Delete a destination file absent from the source
    RemoveFile(PathBuf),
    /// Recursively delete a destination directory absent from the source
    RemoveTree(PathBuf),
    /// Nothing to do
    NoOp(PathBuf),
}

impl SyncAction {
    /// Relative path the decision applies to
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        match self {
            Self::CreateFile(p)
            | Self::CreateTree(p)
            | Self::UpdateFile(p)
            | Self::RemoveFile(p)
            | Self::RemoveTree(p)
            | Self::NoOp(p) => p,
        }
    }

    /// Whether the decision leaves the filesystem alone
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp(_))
    }

    /// Short label for diagnostics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CreateFile(_) => "create-file",
            Self::CreateTree(_) => "create-tree",
            Self::UpdateFile(_) => "update-file",
            Self::RemoveFile(_) => "remove-file",
            Self::RemoveTree(_) => "remove-tree",
            Self::NoOp(_) => "no-op",
        }
    }
}

/// Live state of the destination path matching a source entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counterpart {
    /// Nothing at that path
    Missing,
    /// A directory
    Directory,
    /// A file with its modification time
    File {
        /// Modification time of the destination file
        modified: SystemTime,
    },
}

/// Turns snapshot entries into sync actions
pub struct ActionPlanner;

impl ActionPlanner {
    /// Decide what to do with a destination entry during the removal pass
    ///
    /// An entry survives only if the source lists the same relative path with
    /// the same kind. `still_present` must reflect the disk at decision time:
    /// removing a directory also removes its descendants, which are still in
    /// the destination snapshot.
    #[must_use]
    pub fn plan_removal(dest_entry: &TreeEntry, source: &SnapshotIndex<'_>, still_present: bool) -> SyncAction {
        let relative = dest_entry.relative_path.clone();

        if source.contains(&relative, dest_entry.kind) || !still_present {
            return SyncAction::NoOp(relative);
        }

        match dest_entry.kind {
            EntryKind::Directory => SyncAction::RemoveTree(relative),
            EntryKind::File => SyncAction::RemoveFile(relative),
        }
    }

    /// Decide what to do with a source entry during the addition pass
    #[must_use]
    pub fn plan_addition(source_entry: &TreeEntry, counterpart: Counterpart) -> SyncAction {
        let relative = source_entry.relative_path.clone();

        match (source_entry.kind, counterpart) {
            (EntryKind::Directory, Counterpart::Missing) => SyncAction::CreateTree(relative),
            (EntryKind::File, Counterpart::Missing) => SyncAction::CreateFile(relative),
            (EntryKind::Directory, Counterpart::Directory) => SyncAction::NoOp(relative),
            (EntryKind::File, Counterpart::File { modified }) => match source_entry.modified_time {
                Some(source_time) if !TimestampComparator::differs(source_time, modified) => {
                    SyncAction::NoOp(relative)
                }
                _ => SyncAction::UpdateFile(relative),
            },
            (EntryKind::Directory, Counterpart::File { .. }) | (EntryKind::File, Counterpart::Directory) => {
                // The removal pass already cleared kind mismatches, so another
                // writer got in between. The next pass reconciles it.
                warn!(
                    path = %relative.display(),
                    "destination changed kind during the pass, leaving it for the next pass"
                );
                SyncAction::NoOp(relative)
            }
        }
    }

    /// Whether `relative` equals or lies below one of `roots`
    #[must_use]
    pub fn covered_by(relative: &Path, roots: &[PathBuf]) -> bool {
        roots.iter().any(|root| relative.starts_with(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::TreeSnapshot;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn source_snapshot() -> TreeSnapshot {
        let root = Path::new("/src");
        TreeSnapshot::from_entries(
            root,
            vec![
                TreeEntry::directory(root, ""),
                TreeEntry::file(root, "a.txt", at(100)),
                TreeEntry::directory(root, "sub"),
                TreeEntry::file(root, "sub/b.txt", at(200)),
            ],
        )
    }

    #[test]
    fn test_removal_keeps_entries_present_in_source() {
        let source = source_snapshot();
        let index = source.index();
        let dest = Path::new("/dst");

        let action = ActionPlanner::plan_removal(&TreeEntry::file(dest, "a.txt", at(1)), &index, true);
        assert_eq!(action, SyncAction::NoOp(PathBuf::from("a.txt")));

        let action = ActionPlanner::plan_removal(&TreeEntry::directory(dest, "sub"), &index, true);
        assert!(action.is_noop());
    }

    #[test]
    fn test_removal_of_orphans() {
        let source = source_snapshot();
        let index = source.index();
        let dest = Path::new("/dst");

        let action = ActionPlanner::plan_removal(&TreeEntry::file(dest, "stale.txt", at(1)), &index, true);
        assert_eq!(action, SyncAction::RemoveFile(PathBuf::from("stale.txt")));

        let action = ActionPlanner::plan_removal(&TreeEntry::directory(dest, "orphan"), &index, true);
        assert_eq!(action, SyncAction::RemoveTree(PathBuf::from("orphan")));
    }

    #[test]
    fn test_removal_guard_for_vanished_entries() {
        let source = source_snapshot();
        let index = source.index();
        let dest = Path::new("/dst");

        let action = ActionPlanner::plan_removal(
            &TreeEntry::file(dest, "orphan/child.txt", at(1)),
            &index,
            false,
        );
        assert_eq!(action, SyncAction::NoOp(PathBuf::from("orphan/child.txt")));
    }

    #[test]
    fn test_removal_of_kind_mismatch() {
        let source = source_snapshot();
        let index = source.index();
        let dest = Path::new("/dst");

        // `sub` is a directory in the source but a file here
        let action = ActionPlanner::plan_removal(&TreeEntry::file(dest, "sub", at(1)), &index, true);
        assert_eq!(action, SyncAction::RemoveFile(PathBuf::from("sub")));

        let action = ActionPlanner::plan_removal(&TreeEntry::directory(dest, "a.txt"), &index, true);
        assert_eq!(action, SyncAction::RemoveTree(PathBuf::from("a.txt")));
    }

    #[test]
    fn test_addition_of_missing_entries() {
        let src = Path::new("/src");

        let action = ActionPlanner::plan_addition(&TreeEntry::file(src, "a.txt", at(100)), Counterpart::Missing);
        assert_eq!(action, SyncAction::CreateFile(PathBuf::from("a.txt")));

        let action = ActionPlanner::plan_addition(&TreeEntry::directory(src, "sub"), Counterpart::Missing);
        assert_eq!(action, SyncAction::CreateTree(PathBuf::from("sub")));
    }

    #[test]
    fn test_addition_skips_existing_directories() {
        let action = ActionPlanner::plan_addition(
            &TreeEntry::directory(Path::new("/src"), "sub"),
            Counterpart::Directory,
        );
        assert!(action.is_noop());
    }

    #[test]
    fn test_addition_compares_timestamps_exactly() {
        let entry = TreeEntry::file(Path::new("/src"), "a.txt", at(100));

        let same = ActionPlanner::plan_addition(&entry, Counterpart::File { modified: at(100) });
        assert!(same.is_noop());

        let older = ActionPlanner::plan_addition(&entry, Counterpart::File { modified: at(50) });
        assert_eq!(older, SyncAction::UpdateFile(PathBuf::from("a.txt")));

        let newer = ActionPlanner::plan_addition(&entry, Counterpart::File { modified: at(150) });
        assert_eq!(newer, SyncAction::UpdateFile(PathBuf::from("a.txt")));
    }

    #[test]
    fn test_addition_with_unknown_source_time_updates() {
        let entry = TreeEntry::file(Path::new("/src"), "a.txt", None::<SystemTime>);

        let action = ActionPlanner::plan_addition(&entry, Counterpart::File { modified: at(100) });
        assert_eq!(action, SyncAction::UpdateFile(PathBuf::from("a.txt")));
    }

    #[test]
    fn test_addition_kind_mismatch_is_deferred() {
        let action = ActionPlanner::plan_addition(
            &TreeEntry::file(Path::new("/src"), "x", at(1)),
            Counterpart::Directory,
        );
        assert!(action.is_noop());
    }

    #[test]
    fn test_covered_by_is_component_wise() {
        let roots = vec![PathBuf::from("sub")];

        assert!(ActionPlanner::covered_by(Path::new("sub"), &roots));
        assert!(ActionPlanner::covered_by(Path::new("sub/b.txt"), &roots));
        assert!(!ActionPlanner::covered_by(Path::new("subway/c.txt"), &roots));
        assert!(!ActionPlanner::covered_by(Path::new("a.txt"), &[]));
    }
}
