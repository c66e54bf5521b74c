//! Autosave timing driver.
//!
//! # Responsibility
//! - Decide when a periodic save is due and which ticks retain a snapshot.
//! - Save on application focus so external edits surface as conflicts early.
//! - Remember the last failure for display.
//!
//! The scheduler never spawns threads; the host calls `poll_at` from its own
//! timer and passes `&mut ProjectSession`, so saves cannot overlap.

use super::project_session::ProjectSession;
use crate::persist::PersistResult;
use log::{info, warn};
use std::time::{Duration, Instant};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_SNAPSHOT_EVERY: u32 = 30;
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Autosave cadence. Built through `new` or `default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    interval: Duration,
    snapshot_every: u32,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
        }
    }
}

impl AutosaveConfig {
    /// Builds a config clamped to a 1 s interval and 1-tick snapshot minimum.
    pub fn new(interval: Duration, snapshot_every: u32) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            snapshot_every: snapshot_every.max(1),
        }
    }

    /// Time between periodic saves.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Every Nth periodic save also writes a retained snapshot.
    pub fn snapshot_every(&self) -> u32 {
        self.snapshot_every
    }
}

/// Last failed save, kept for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFailure {
    pub conflict: bool,
    pub message: String,
}

/// Drives periodic and focus-triggered saves of one session.
#[derive(Debug)]
pub struct AutosaveScheduler {
    config: AutosaveConfig,
    next_due: Instant,
    ticks: u64,
    last_failure: Option<SaveFailure>,
}

impl AutosaveScheduler {
    /// First periodic save is due one interval after `now`.
    pub fn new(config: AutosaveConfig, now: Instant) -> Self {
        Self {
            config,
            next_due: now + config.interval,
            ticks: 0,
            last_failure: None,
        }
    }

    pub fn config(&self) -> AutosaveConfig {
        self.config
    }

    /// Periodic saves attempted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_failure(&self) -> Option<&SaveFailure> {
        self.last_failure.as_ref()
    }

    /// Whether the tick after the current one retains a snapshot.
    pub fn next_tick_is_snapshot(&self) -> bool {
        (self.ticks + 1) % u64::from(self.config.snapshot_every.max(1)) == 0
    }

    /// Saves if the interval elapsed. Returns `None` when nothing was due.
    ///
    /// A failed tick still counts and still reschedules, so a persistent
    /// conflict does not turn into a tight retry loop.
    pub fn poll_at(
        &mut self,
        now: Instant,
        session: &mut ProjectSession,
    ) -> Option<PersistResult<i64>> {
        if now < self.next_due {
            return None;
        }
        let snapshot = self.next_tick_is_snapshot();
        self.ticks += 1;
        self.next_due = now + self.config.interval;

        let result = session.save(snapshot);
        self.record_outcome(&result);
        Some(result)
    }

    /// Saves immediately, without a snapshot, and restarts the interval.
    pub fn on_focus(&mut self, now: Instant, session: &mut ProjectSession) -> PersistResult<i64> {
        self.next_due = now + self.config.interval;
        let result = session.save(false);
        self.record_outcome(&result);
        result
    }

    /// Updates `last_failure` from a save result.
    pub fn record_outcome(&mut self, result: &PersistResult<i64>) {
        match result {
            Ok(_) => {
                if self.last_failure.take().is_some() {
                    info!("event=autosave module=service status=recovered");
                }
            }
            Err(err) => {
                warn!(
                    "event=autosave module=service status=error error_code={} tick={}",
                    err.code(),
                    self.ticks
                );
                self.last_failure = Some(SaveFailure {
                    conflict: err.is_conflict(),
                    message: err.to_string(),
                });
            }
        }
    }
}
