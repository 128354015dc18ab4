//! Wall-clock sources
//!
//! Reminder fire times are local-naive, so every clock reports local wall
//! time as a `NaiveDateTime`. The monitor never calls `Local::now()`
//! directly, which lets tests drive it with virtual time.

use chrono::{Local, NaiveDateTime};
use std::sync::{Arc, Mutex};

/// Convert a std duration to a chrono one, saturating at `i64::MAX` milliseconds
pub fn chrono_duration(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Source of the current local wall time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Real local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Wall time derived from the tokio timer.
///
/// Reports `base` plus the tokio time elapsed since construction. Under
/// `tokio::time::pause` this advances exactly with the virtual clock, so
/// interval-driven code and the times it observes stay in lockstep.
#[derive(Debug, Clone)]
pub struct TokioClock {
    base: NaiveDateTime,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(base: NaiveDateTime) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> NaiveDateTime {
        self.base + chrono_duration(self.started.elapsed())
    }
}

/// Manually advanced clock for unit tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
