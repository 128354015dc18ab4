//! Reminder poller
//!
//! Keeps an in-memory snapshot of the backend's reminder list. Only the
//! poller writes the snapshot; the due-check loop only reads it.

use crate::api::{Reminder, ReminderScope, ReminderSource};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct ReminderPoller {
    source: Arc<dyn ReminderSource>,
    scope: ReminderScope,
    reminders: Arc<RwLock<Vec<Reminder>>>,
}

impl ReminderPoller {
    pub fn new(source: Arc<dyn ReminderSource>, scope: ReminderScope) -> Self {
        Self {
            source,
            scope,
            reminders: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn scope(&self) -> ReminderScope {
        self.scope
    }

    /// Replace the snapshot with a fresh fetch.
    ///
    /// A failed fetch is logged and the previous snapshot kept.
    /// Returns whether the snapshot was replaced.
    pub async fn refresh(&self) -> bool {
        match self.source.list_reminders(self.scope).await {
            Ok(reminders) => {
                tracing::debug!("Fetched {} reminders for {:?}", reminders.len(), self.scope);
                *self.reminders.write().await = reminders;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to fetch reminders: {}", e);
                false
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<Reminder> {
        self.reminders.read().await.clone()
    }
}
