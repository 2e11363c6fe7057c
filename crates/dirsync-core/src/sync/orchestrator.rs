//! Sync orchestration - coordinates the sync workflow

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use super::actions::{ActionPlanner, Counterpart, SyncAction};
use super::executor::FileOperationExecutor;
use super::reporting::ChangeSink;
use super::{PassMode, SyncResult};
use crate::comparison::TimestampComparator;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::scanner::{Scanner, TreeSnapshot, join_relative};

/// Main sync engine
pub struct SyncEngine {
    config: SyncConfig,
    executor: FileOperationExecutor,
}

impl SyncEngine {
    /// Create a new sync engine
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        let executor = FileOperationExecutor::new(&config.source_root, &config.dest_root, config.dry_run);
        Self { config, executor }
    }

    /// Run one pass, making the destination mirror the source
    ///
    /// A missing destination is bootstrapped with a single tree copy.
    /// Otherwise the destination is first shrunk to entries the source also
    /// has, then grown to everything the source has. Each applied change is
    /// handed to `sink` as soon as it is done.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before touching anything if the roots
    /// are unusable, or the first I/O error that aborts the pass.
    pub fn synchronize(&self, sink: &mut dyn ChangeSink) -> Result<SyncResult> {
        let _span = info_span!(
            "sync",
            source = %self.config.source_root.display(),
            dest = %self.config.dest_root.display()
        )
        .entered();

        self.config.validate()?;

        let mut result = SyncResult {
            dry_run: self.config.dry_run,
            ..SyncResult::default()
        };

        if !self.config.dest_root.exists() {
            info!("destination missing, copying whole source tree");
            result.mode = PassMode::Bootstrap;
            self.run(SyncAction::CreateTree(PathBuf::new()), sink, &mut result)?;
            return Ok(result);
        }

        info!("reconciling existing destination");
        result.mode = PassMode::Reconcile;
        let source = Scanner::snapshot(&self.config.source_root)?;
        let dest = Scanner::snapshot(&self.config.dest_root)?;
        Self::collect_warnings(&source, &mut result);
        Self::collect_warnings(&dest, &mut result);

        let removed = self.removal_pass(&dest, &source, sink, &mut result)?;
        self.addition_pass(&source, &removed, sink, &mut result)?;

        info!(
            created = result.created,
            updated = result.updated,
            removed = result.removed,
            unchanged = result.unchanged,
            "pass complete"
        );
        Ok(result)
    }

    /// Remove destination entries the source does not have
    ///
    /// Returns the relative paths removed (or, in dry-run mode, planned for
    /// removal).
    fn removal_pass(
        &self,
        dest: &TreeSnapshot,
        source: &TreeSnapshot,
        sink: &mut dyn ChangeSink,
        result: &mut SyncResult,
    ) -> Result<Vec<PathBuf>> {
        let source_index = source.index();
        let mut removed: Vec<PathBuf> = Vec::new();

        for entry in dest {
            // Earlier removals may have taken this entry with them. In dry-run
            // mode they are still on disk, hence the bookkeeping.
            let still_present = !ActionPlanner::covered_by(&entry.relative_path, &removed)
                && entry.absolute_path.symlink_metadata().is_ok();

            let action = ActionPlanner::plan_removal(entry, &source_index, still_present);
            if !action.is_noop() {
                removed.push(entry.relative_path.clone());
            }
            self.run(action, sink, result)?;
        }

        Ok(removed)
    }

    /// Copy source entries missing or out of date in the destination
    fn addition_pass(
        &self,
        source: &TreeSnapshot,
        removed: &[PathBuf],
        sink: &mut dyn ChangeSink,
        result: &mut SyncResult,
    ) -> Result<()> {
        let mut created: Vec<PathBuf> = Vec::new();

        for entry in source {
            if ActionPlanner::covered_by(&entry.relative_path, &created) {
                // Already brought over by an ancestor's tree copy.
                result.tally(SyncAction::NoOp(entry.relative_path.clone()));
                continue;
            }

            let counterpart = if self.config.dry_run && ActionPlanner::covered_by(&entry.relative_path, removed) {
                Counterpart::Missing
            } else {
                self.counterpart(&entry.relative_path)?
            };

            let action = ActionPlanner::plan_addition(entry, counterpart);
            if matches!(action, SyncAction::CreateTree(_)) {
                created.push(entry.relative_path.clone());
            }
            self.run(action, sink, result)?;
        }

        Ok(())
    }

    /// Look up the live destination state for `relative`
    fn counterpart(&self, relative: &Path) -> Result<Counterpart> {
        let path = join_relative(&self.config.dest_root, relative);
        match path.metadata() {
            Ok(meta) if meta.is_dir() => Ok(Counterpart::Directory),
            Ok(_) => Ok(Counterpart::File {
                modified: TimestampComparator::modified_time(&path)?,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Counterpart::Missing),
            Err(e) => Err(SyncError::io("read metadata of", path, e)),
        }
    }

    /// Apply one decision, report it, and account for it
    fn run(&self, action: SyncAction, sink: &mut dyn ChangeSink, result: &mut SyncResult) -> Result<()> {
        debug!(action = action.label(), path = %action.relative_path().display(), "decided");

        if let Some(record) = self.executor.apply(&action)? {
            sink.record(&record)?;
        }
        result.tally(action);
        Ok(())
    }

    fn collect_warnings(snapshot: &TreeSnapshot, result: &mut SyncResult) {
        result.warnings.extend(snapshot.warnings().iter().cloned());
    }
}
