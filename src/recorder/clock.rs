//! Wall-clock source for the recorder

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: parking_lot::Mutex::new(
                DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            ),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(chrono::TimeDelta::seconds(secs));
    }

    pub fn advance(&self, delta: chrono::TimeDelta) {
        *self.now.lock() += delta;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
