//! Change records, log sinks and pass summaries

use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::SyncResult;
use crate::error::{Result, SyncError};
use crate::scanner::EntryKind;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f%:z";

/// Operation recorded for an applied action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Entry copied into the destination
    Copy,
    /// Destination file overwritten with a fresh copy
    Update,
    /// Entry removed from the destination
    Remove,
}

impl Operation {
    /// Verb used in log lines
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Copy => "Copying",
            Self::Update => "Updating",
            Self::Remove => "Removing",
        }
    }
}

/// One applied change, written out once and then dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// When the change was applied
    pub timestamp: DateTime<Local>,
    /// What was done
    pub operation: Operation,
    /// File or directory
    pub object_kind: EntryKind,
    /// Source path for copies, destination path for removals
    pub path: PathBuf,
    /// Destination path for copies
    pub counterpart_path: Option<PathBuf>,
    /// Change was only planned, not applied
    pub dry_run: bool,
}

impl ChangeRecord {
    /// Record a change stamped with the current local time
    #[must_use]
    pub fn now(
        operation: Operation,
        object_kind: EntryKind,
        path: impl Into<PathBuf>,
        counterpart_path: Option<PathBuf>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            operation,
            object_kind,
            path: path.into(),
            counterpart_path,
            dry_run: false,
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            f.write_str("[DRY RUN] ")?;
        }
        write!(
            f,
            "{}: {} {} {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.operation.verb(),
            self.path.display(),
            self.object_kind.as_str()
        )?;
        if let Some(counterpart) = &self.counterpart_path {
            write!(f, " to {}", counterpart.display())?;
        }
        f.write_str(".")
    }
}

/// Destination for change records
pub trait ChangeSink {
    /// Write out one record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn record(&mut self, change: &ChangeRecord) -> Result<()>;
}

impl ChangeSink for Vec<ChangeRecord> {
    fn record(&mut self, change: &ChangeRecord) -> Result<()> {
        self.push(change.clone());
        Ok(())
    }
}

/// Appends each record to a log file and echoes it to a console stream
pub struct LogReporter<W: Write = io::Stdout> {
    log: Option<(PathBuf, File)>,
    console: W,
}

impl LogReporter<io::Stdout> {
    /// Open `log_path` for appending and echo to stdout
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened.
    pub fn open(log_path: &Path) -> Result<Self> {
        Self::with_console(log_path, io::stdout())
    }

    /// Echo to stdout only
    #[must_use]
    pub fn console_only() -> Self {
        Self {
            log: None,
            console: io::stdout(),
        }
    }
}

impl<W: Write> LogReporter<W> {
    /// Open `log_path` for appending and echo to `console`
    ///
    /// # Errors
    ///
    /// Returns an error if the log file or its parent directory cannot be created.
    pub fn with_console(log_path: &Path, console: W) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SyncError::Report {
                path: log_path.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|source| SyncError::Report {
                path: log_path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            log: Some((log_path.to_path_buf(), file)),
            console,
        })
    }

    /// Give back the console writer
    pub fn into_console(self) -> W {
        self.console
    }
}

impl<W: Write> ChangeSink for LogReporter<W> {
    fn record(&mut self, change: &ChangeRecord) -> Result<()> {
        let line = change.to_string();

        if let Some((path, file)) = &mut self.log {
            writeln!(file, "{line}")
                .and_then(|()| file.flush())
                .map_err(|source| SyncError::Report {
                    path: path.clone(),
                    source,
                })?;
        }

        // A closed console must not fail the pass once the log has the line.
        if let Err(e) = writeln!(self.console, "{line}") {
            tracing::debug!(error = %e, "console write failed");
        }
        Ok(())
    }
}

/// Sync operation reporter
pub struct SyncReporter;

impl SyncReporter {
    /// Generate a summary report
    #[must_use]
    pub fn generate_summary(result: &SyncResult) -> String {
        let mut output = String::new();

        output.push_str("\n=== Sync Summary ===\n");
        let _ = writeln!(output, "Mode:     {}", result.mode);
        let _ = writeln!(output, "Created:  {}", result.created);
        let _ = writeln!(output, "Updated:  {}", result.updated);
        let _ = writeln!(output, "Removed:  {}", result.removed);
        let _ = writeln!(output, "Unchanged: {}", result.unchanged);

        if !result.warnings.is_empty() {
            let _ = writeln!(output, "\nWarnings ({}):", result.warnings.len());
            for warning in &result.warnings {
                let _ = writeln!(output, "  - {warning}");
            }
        }

        let _ = writeln!(output, "\nTotal operations: {}", result.total_operations());

        if result.is_converged() {
            output.push_str("Status: ✓ Already in sync\n");
        } else if result.dry_run {
            output.push_str("Status: dry run, destination left untouched\n");
        } else {
            output.push_str("Status: ✓ Mirror updated\n");
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_record(operation: Operation, kind: EntryKind, counterpart: Option<&str>) -> ChangeRecord {
        ChangeRecord {
            timestamp: Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            operation,
            object_kind: kind,
            path: PathBuf::from("/src/a.txt"),
            counterpart_path: counterpart.map(PathBuf::from),
            dry_run: false,
        }
    }

    #[test]
    fn test_copy_line_format() {
        let line = fixed_record(Operation::Copy, EntryKind::File, Some("/dst/a.txt")).to_string();

        assert!(line.starts_with("2024-03-01 12:30:05.000000"));
        assert!(line.ends_with(": Copying /src/a.txt file to /dst/a.txt."));
    }

    #[test]
    fn test_remove_line_format() {
        let line = fixed_record(Operation::Remove, EntryKind::Directory, None).to_string();

        assert!(line.ends_with(": Removing /src/a.txt directory."));
    }

    #[test]
    fn test_dry_run_prefix() {
        let mut record = fixed_record(Operation::Update, EntryKind::File, Some("/dst/a.txt"));
        record.dry_run = true;

        let line = record.to_string();
        assert!(line.starts_with("[DRY RUN] "));
        assert!(line.contains("Updating /src/a.txt file to /dst/a.txt."));
    }

    #[test]
    fn test_log_reporter_appends_and_echoes() {
        let tmp = TempDir::new().unwrap();
        let log_path = tmp.path().join("logs/sync.log");
        std::fs::create_dir_all(tmp.path().join("logs")).unwrap();
        std::fs::write(&log_path, "earlier line\n").unwrap();

        let mut reporter = LogReporter::with_console(&log_path, Vec::new()).unwrap();
        let record = fixed_record(Operation::Copy, EntryKind::File, Some("/dst/a.txt"));
        reporter.record(&record).unwrap();
        reporter.record(&record).unwrap();

        let console = String::from_utf8(reporter.into_console()).unwrap();
        let log = std::fs::read_to_string(&log_path).unwrap();

        assert_eq!(console.lines().count(), 2);
        assert_eq!(log.lines().count(), 3);
        assert!(log.starts_with("earlier line\n"));
        assert!(log.ends_with(&format!("{record}\n")));
    }

    #[test]
    fn test_log_reporter_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let log_path = tmp.path().join("nested/dir/sync.log");

        let reporter = LogReporter::with_console(&log_path, Vec::new());

        assert!(reporter.is_ok());
        assert!(log_path.exists());
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<ChangeRecord> = Vec::new();
        sink.record(&fixed_record(Operation::Remove, EntryKind::File, None)).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].operation, Operation::Remove);
    }

    #[test]
    fn test_summary_counts() {
        let result = SyncResult {
            created: 2,
            removed: 1,
            ..SyncResult::default()
        };

        let summary = SyncReporter::generate_summary(&result);

        assert!(summary.contains("Created:  2"));
        assert!(summary.contains("Removed:  1"));
        assert!(summary.contains("Total operations: 3"));
        assert!(summary.contains("Mirror updated"));
    }
}
