//! Due-check engine
//!
//! Decides which reminder, if any, becomes the active alarm on a tick.
//!
//! Per tick, reminders are scanned in list order and the first match wins:
//! - seen (dismissed) reminders are skipped unless they have a snooze entry
//! - reminders whose snooze wake time is still ahead are skipped
//! - a reminder whose fire time passed less than 60 s ago is activated
//! - a reminder whose snooze has expired is activated and its entry consumed
//!
//! While an alarm is active no scan happens, so at most one alarm exists.
//! A reminder that is never observed inside its 60 s window (the process
//! was suspended, or the poll picked it up late) is never shown.

use crate::api::{Reminder, ReminderId};
use crate::clock::chrono_duration;
use crate::config::DUE_WINDOW;
use crate::services::snooze::SnoozeLedger;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DueCheckEngine {
    seen: HashSet<ReminderId>,
    ledger: SnoozeLedger,
    active: Option<Reminder>,
}

impl DueCheckEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Reminder> {
        self.active.as_ref()
    }

    pub fn is_seen(&self, id: &ReminderId) -> bool {
        self.seen.contains(id)
    }

    pub fn ledger(&self) -> &SnoozeLedger {
        &self.ledger
    }

    /// Scan `reminders` and return the reminder that just became active
    pub fn tick(&mut self, now: NaiveDateTime, reminders: &[Reminder]) -> Option<Reminder> {
        if self.active.is_some() {
            return None;
        }

        let window = chrono_duration(DUE_WINDOW);

        for reminder in reminders {
            let id = &reminder.id;
            let snoozed = self.ledger.contains(id);

            if self.seen.contains(id) && !snoozed {
                continue;
            }
            if self.ledger.is_snoozed(id, now) {
                continue;
            }

            let diff = now - reminder.reminder_time;
            if diff >= Duration::zero() && diff < window {
                // A stale expired entry must not re-fire after a later dismiss
                self.ledger.take_expired(id, now);
                return Some(self.activate(reminder));
            }

            if self.ledger.take_expired(id, now).is_some() {
                tracing::info!("Snooze expired for reminder {}", id);
                return Some(self.activate(reminder));
            }

            if diff >= window && !self.seen.contains(id) {
                tracing::trace!("Reminder {} passed its due window unseen", id);
            }
        }

        None
    }

    fn activate(&mut self, reminder: &Reminder) -> Reminder {
        tracing::info!("Reminder {} is due: {}", reminder.id, reminder.message);
        self.active = Some(reminder.clone());
        reminder.clone()
    }

    /// Dismiss the active alarm; it will not re-trigger this session
    pub fn dismiss(&mut self) -> Option<Reminder> {
        let reminder = self.active.take()?;
        self.seen.insert(reminder.id.clone());
        tracing::info!("Reminder {} dismissed", reminder.id);
        Some(reminder)
    }

    /// Snooze the active alarm for 5 minutes from `now`
    pub fn snooze(&mut self, now: NaiveDateTime) -> Option<(Reminder, NaiveDateTime)> {
        let reminder = self.active.take()?;
        let wake = self.ledger.snooze(reminder.id.clone(), now);
        tracing::info!("Reminder {} snoozed until {}", reminder.id, wake);
        Some((reminder, wake))
    }
}
