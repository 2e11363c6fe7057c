//! Repeats synchronization passes until interrupted

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use dirsync_core::SyncError;

use crate::cli::TimeUnit;

/// When passes run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// A single pass
    Once,
    /// A pass at startup, then one per interval
    Every(Duration),
}

impl Schedule {
    /// Interval of `number` `unit`s
    #[must_use]
    pub const fn from_interval(number: u64, unit: TimeUnit) -> Self {
        Self::Every(unit.duration(number))
    }
}

/// Drives passes according to a [`Schedule`]
pub struct Scheduler {
    schedule: Schedule,
    shutdown: Arc<AtomicBool>,
    tick: Duration,
}

impl Scheduler {
    /// Create a scheduler that stops once `shutdown` is set
    #[must_use]
    pub fn new(schedule: Schedule, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            schedule,
            shutdown,
            tick: Duration::from_secs(1),
        }
    }

    /// How often the shutdown flag is polled while waiting
    #[cfg(test)]
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run passes until the schedule ends or shutdown is requested
    ///
    /// A pass in progress always runs to completion. In interval mode only a
    /// fatal error stops the loop; other failures are logged and the next
    /// pass runs as usual.
    ///
    /// # Errors
    ///
    /// Returns the error of a once-only pass, or the first fatal error.
    pub fn run<F>(&self, mut pass: F) -> Result<usize, SyncError>
    where
        F: FnMut() -> Result<(), SyncError>,
    {
        let interval = match self.schedule {
            Schedule::Once => {
                pass()?;
                return Ok(1);
            }
            Schedule::Every(interval) => interval,
        };

        let mut passes = 0;
        loop {
            let started = Instant::now();
            passes += 1;
            match pass() {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::error!(error = %e, pass = passes, "sync pass failed"),
            }

            // An interval too long to represent waits for shutdown only.
            if !self.wait_until(started.checked_add(interval)) {
                tracing::info!(passes, "shutdown requested, stopping");
                return Ok(passes);
            }
        }
    }

    /// Sleep until `deadline`, or forever without one; false if shutdown
    /// was requested meanwhile
    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return false;
            }
            let now = Instant::now();
            let nap = match deadline {
                Some(deadline) if now >= deadline => return true,
                Some(deadline) => self.tick.min(deadline - now),
                None => self.tick,
            };
            thread::sleep(nap);
        }
    }
}
