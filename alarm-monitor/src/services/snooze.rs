//! Snooze ledger
//!
//! Session-scoped map from reminder id to the time it should fire again.

use crate::api::ReminderId;
use crate::clock::chrono_duration;
use crate::config::SNOOZE_DURATION;
use chrono::NaiveDateTime;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct SnoozeLedger {
    entries: HashMap<ReminderId, NaiveDateTime>,
}

impl SnoozeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer `id` until `now + 5 min`, replacing any earlier entry
    pub fn snooze(&mut self, id: ReminderId, now: NaiveDateTime) -> NaiveDateTime {
        let wake = now + chrono_duration(SNOOZE_DURATION);
        self.entries.insert(id, wake);
        wake
    }

    pub fn wake_time(&self, id: &ReminderId) -> Option<NaiveDateTime> {
        self.entries.get(id).copied()
    }

    /// Whether `id` has an entry that has not yet come due
    pub fn is_snoozed(&self, id: &ReminderId, now: NaiveDateTime) -> bool {
        self.wake_time(id).is_some_and(|wake| wake > now)
    }

    /// Remove and return the entry for `id` if its wake time has passed
    pub fn take_expired(&mut self, id: &ReminderId, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.entries.get(id) {
            Some(wake) if *wake <= now => self.entries.remove(id),
            _ => None,
        }
    }

    pub fn contains(&self, id: &ReminderId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
