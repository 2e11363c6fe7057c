use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::Schedule;

/// One-way directory mirroring tool
///
/// Synchronize the destination directory to exactly match the source directory,
/// once or repeatedly at a fixed interval
#[derive(Parser, Debug)]
#[command(name = "dirsync")]
#[command(about, long_about = None, version)]
#[command(group(ArgGroup::new("mode").required(true).args(["unit", "once"])))]
pub struct Cli {
    /// Path to the source directory
    pub source: PathBuf,

    /// Path to the destination directory (created if it does not exist)
    pub destination: PathBuf,

    /// Path to the file where changes are logged
    pub log_file: PathBuf,

    /// Length of the interval between passes, in --unit
    #[arg(short, long, requires = "unit", value_parser = clap::value_parser!(u64).range(1..))]
    pub number: Option<u64>,

    /// Time unit of the interval between passes
    #[arg(short, long, value_enum, requires = "number")]
    pub unit: Option<TimeUnit>,

    /// Run synchronization only once
    #[arg(short, long)]
    pub once: bool,

    /// Preview changes without executing (dry-run)
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Schedule selected by `--once` or `--unit`/`--number`
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        match (self.unit, self.number) {
            (Some(unit), Some(number)) if !self.once => Schedule::from_interval(number, unit),
            _ => Schedule::Once,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeUnit {
    /// Interval counted in seconds
    Seconds,
    /// Interval counted in minutes
    Minutes,
    /// Interval counted in hours
    Hours,
}

impl TimeUnit {
    /// Duration of `number` units
    #[must_use]
    pub const fn duration(self, number: u64) -> Duration {
        let per_unit = match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
        };
        Duration::from_secs(number.saturating_mul(per_unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dirsync").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_once_mode() {
        let cli = parse(&["src", "dst", "sync.log", "--once"]).unwrap();

        assert_eq!(cli.schedule(), Schedule::Once);
        assert_eq!(cli.source, PathBuf::from("src"));
        assert_eq!(cli.log_file, PathBuf::from("sync.log"));
    }

    #[test]
    fn test_interval_mode() {
        let cli = parse(&["src", "dst", "sync.log", "-u", "minutes", "-n", "5"]).unwrap();

        assert_eq!(cli.schedule(), Schedule::Every(Duration::from_secs(300)));
    }

    #[test]
    fn test_mode_is_required() {
        assert!(parse(&["src", "dst", "sync.log"]).is_err());
    }

    #[test]
    fn test_once_conflicts_with_unit() {
        assert!(parse(&["src", "dst", "sync.log", "--once", "-u", "seconds", "-n", "1"]).is_err());
    }

    #[test]
    fn test_unit_requires_number() {
        assert!(parse(&["src", "dst", "sync.log", "-u", "hours"]).is_err());
    }

    #[test]
    fn test_number_must_be_positive() {
        assert!(parse(&["src", "dst", "sync.log", "-u", "seconds", "-n", "0"]).is_err());
    }

    #[test]
    fn test_unit_durations() {
        assert_eq!(TimeUnit::Seconds.duration(30), Duration::from_secs(30));
        assert_eq!(TimeUnit::Minutes.duration(2), Duration::from_secs(120));
        assert_eq!(TimeUnit::Hours.duration(1), Duration::from_secs(3600));
    }
}
