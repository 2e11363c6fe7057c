//! One-way reconciliation engine
//!
//! A pass removes destination entries the source lacks, then copies source
//! entries the destination lacks or holds with a different modification time.
//! Decisions are applied and reported one at a time, so later decisions see
//! the effect of earlier ones.

mod actions;
mod executor;
mod orchestrator;
mod reporting;


use std::fmt;

pub use actions::{ActionPlanner, Counterpart, SyncAction};
pub use executor::FileOperationExecutor;
pub use orchestrator::SyncEngine;
pub use reporting::{ChangeRecord, ChangeSink, LogReporter, Operation, SyncReporter};

/// How a pass treated the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassMode {
    /// Destination did not exist and was copied wholesale
    Bootstrap,
    /// Destination existed and was diffed entry by entry
    #[default]
    Reconcile,
}

impl fmt::Display for PassMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bootstrap => "bootstrap",
            Self::Reconcile => "reconcile",
        })
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Bootstrap or reconcile
    pub mode: PassMode,
    /// Every decision taken, no-ops included, in order
    pub actions: Vec<SyncAction>,
    /// Files and trees copied in
    pub created: usize,
    /// Files recopied
    pub updated: usize,
    /// Files and trees removed
    pub removed: usize,
    /// Entries left alone
    pub unchanged: usize,
    /// Non-fatal scan problems
    pub warnings: Vec<String>,
    /// Decisions were reported but not applied
    pub dry_run: bool,
}

impl SyncResult {
    /// Total operations performed
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.created + self.updated + self.removed
    }

    /// Decisions that change the destination
    pub fn changes(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| !a.is_noop())
    }

    /// Whether the pass found nothing to do
    #[must_use]
    pub const fn is_converged(&self) -> bool {
        self.total_operations() == 0
    }

    fn tally(&mut self, action: SyncAction) {
        match action {
            SyncAction::CreateFile(_) | SyncAction::CreateTree(_) => self.created += 1,
            SyncAction::UpdateFile(_) => self.updated += 1,
            SyncAction::RemoveFile(_) | SyncAction::RemoveTree(_) => self.removed += 1,
            SyncAction::NoOp(_) => self.unchanged += 1,
        }
        self.actions.push(action);
    }
}
