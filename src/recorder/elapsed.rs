//! Paused-aware elapsed time
//!
//! The displayed duration is derived from wall-clock samples only, so it can
//! be recomputed at any instant by any periodic sampler. Time spent paused is
//! excluded and the value freezes while paused.

use crate::utils::format_mm_ss;
use chrono::{DateTime, TimeDelta, Utc};

/// How long the final duration stays visible after a stop, in seconds
pub const DEFAULT_RESET_GRACE_SECS: i64 = 2;

/// Elapsed recording time given the raw samples.
///
/// `paused_since` is set while the session is paused; the clock is then read
/// at that instant instead of `now`, which freezes the value.
pub fn compute_elapsed(
    started_at: DateTime<Utc>,
    paused_since: Option<DateTime<Utc>>,
    paused_accumulated: TimeDelta,
    now: DateTime<Utc>,
) -> TimeDelta {
    let until = paused_since.unwrap_or(now);
    (until - started_at - paused_accumulated).max(TimeDelta::zero())
}

#[derive(Debug, Clone, Copy)]
struct Stopped {
    at: DateTime<Utc>,
    elapsed: TimeDelta,
}

#[derive(Debug, Clone)]
pub struct ElapsedTracker {
    started_at: Option<DateTime<Utc>>,
    paused_since: Option<DateTime<Utc>>,
    paused_accumulated: TimeDelta,
    stopped: Option<Stopped>,
    reset_grace: TimeDelta,
}

impl Default for ElapsedTracker {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_RESET_GRACE_SECS))
    }
}

impl ElapsedTracker {
    pub fn new(reset_grace: TimeDelta) -> Self {
        Self {
            started_at: None,
            paused_since: None,
            paused_accumulated: TimeDelta::zero(),
            stopped: None,
            reset_grace,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
        self.paused_since = None;
        self.paused_accumulated = TimeDelta::zero();
        self.stopped = None;
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_some() && self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.paused_since.take() {
            self.paused_accumulated += (now - since).max(TimeDelta::zero());
        }
    }

    /// Freeze the final value and return it
    pub fn stop(&mut self, now: DateTime<Utc>) -> TimeDelta {
        let elapsed = self.elapsed(now);
        self.started_at = None;
        self.paused_since = None;
        self.stopped = Some(Stopped { at: now, elapsed });
        elapsed
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        if let Some(stopped) = self.stopped {
            return stopped.elapsed;
        }
        match self.started_at {
            Some(started_at) => {
                compute_elapsed(started_at, self.paused_since, self.paused_accumulated, now)
            }
            None => TimeDelta::zero(),
        }
    }

    /// `MM:SS` as it should be shown at `now`
    pub fn display(&self, now: DateTime<Utc>) -> String {
        if let Some(stopped) = self.stopped {
            if now - stopped.at >= self.reset_grace {
                return format_mm_ss(0);
            }
        }
        format_mm_ss(self.elapsed(now).num_seconds())
    }
}
