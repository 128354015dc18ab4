//! Alarm monitor
//!
//! Drives the poller and the due-check engine on their own cadences:
//! - reminders are fetched once at start, then every 30 seconds
//! - the in-memory list is checked at start, then every 10 seconds
//!
//! Newly raised alarms are broadcast to subscribers and forwarded to the
//! desktop notifier. Both loops stop when the handle is dropped.

use crate::api::{NotificationPreferences, Reminder};
use crate::clock::Clock;
use crate::config::{DUE_CHECK_INTERVAL, EVENT_CHANNEL_CAPACITY, POLL_INTERVAL};
use crate::services::due_check::DueCheckEngine;
use crate::services::notifier::AlarmNotifier;
use crate::services::poller::ReminderPoller;
use crate::sound::{SoundEngine, SoundId};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Alarm lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmEvent {
    Raised { reminder: Reminder, sound: SoundId },
    Dismissed(Reminder),
    Snoozed { reminder: Reminder, until: NaiveDateTime },
}

/// Loop cadences
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub due_check_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            due_check_interval: DUE_CHECK_INTERVAL,
        }
    }
}

struct Shared {
    poller: ReminderPoller,
    engine: Mutex<DueCheckEngine>,
    clock: Arc<dyn Clock>,
    notifier: Option<AlarmNotifier>,
    preferences: RwLock<NotificationPreferences>,
    events: broadcast::Sender<AlarmEvent>,
}

impl Shared {
    fn publish(&self, event: AlarmEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn check_due(&self) -> Option<Reminder> {
        let reminders = self.poller.snapshot().await;
        let now = self.clock.now();

        let fired = self.engine.lock().await.tick(now, &reminders)?;
        let prefs = self.preferences.read().await.clone();

        self.publish(AlarmEvent::Raised {
            reminder: fired.clone(),
            sound: prefs.sound,
        });

        if let Some(notifier) = self.notifier.as_ref().filter(|_| prefs.desktop_enabled) {
            let body = match fired.event.as_ref().and_then(|e| e.title.as_deref()) {
                Some(title) => format!("{} ({})", fired.message, title),
                None => fired.message.clone(),
            };
            notifier
                .notify(now.time(), prefs.quiet_hours.as_ref(), "Reminder", &body)
                .await;
        }

        Some(fired)
    }
}

pub struct AlarmMonitor;

impl AlarmMonitor {
    /// Fetch reminders once, then start both loops with the default cadence
    pub async fn start(
        poller: ReminderPoller,
        clock: Arc<dyn Clock>,
        notifier: Option<AlarmNotifier>,
        preferences: NotificationPreferences,
    ) -> MonitorHandle {
        Self::start_with_config(poller, clock, notifier, preferences, MonitorConfig::default())
            .await
    }

    pub async fn start_with_config(
        poller: ReminderPoller,
        clock: Arc<dyn Clock>,
        notifier: Option<AlarmNotifier>,
        preferences: NotificationPreferences,
        config: MonitorConfig,
    ) -> MonitorHandle {
        tracing::info!(
            "Starting alarm monitor for {:?} (poll {:?}, due check {:?})",
            poller.scope(),
            config.poll_interval,
            config.due_check_interval
        );

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            poller,
            engine: Mutex::new(DueCheckEngine::new()),
            clock,
            notifier,
            preferences: RwLock::new(preferences),
            events,
        });

        // Initial fetch completes before the first due check sees the list
        shared.poller.refresh().await;

        let poll_task = {
            let shared = Arc::clone(&shared);
            let period = config.poll_interval;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    shared.poller.refresh().await;
                }
            })
        };

        let due_task = {
            let shared = Arc::clone(&shared);
            let period = config.due_check_interval;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    shared.check_due().await;
                }
            })
        };

        MonitorHandle {
            shared,
            tasks: vec![poll_task, due_task],
            sound: None,
        }
    }
}

/// Owner of a running monitor. Dropping it stops both loops.
pub struct MonitorHandle {
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
    sound: Option<Arc<SoundEngine>>,
}

impl MonitorHandle {
    /// Keep `sound` in step with the monitor's preferences from now on
    pub async fn with_sound(mut self, sound: Arc<SoundEngine>) -> Self {
        sound.apply_preferences(&*self.shared.preferences.read().await);
        self.sound = Some(sound);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.shared.events.subscribe()
    }

    pub async fn active(&self) -> Option<Reminder> {
        self.shared.engine.lock().await.active().cloned()
    }

    pub async fn reminders(&self) -> Vec<Reminder> {
        self.shared.poller.snapshot().await
    }

    /// Dismiss the active alarm for the rest of the session
    pub async fn dismiss(&self) -> Option<Reminder> {
        let dismissed = self.shared.engine.lock().await.dismiss()?;
        self.shared.publish(AlarmEvent::Dismissed(dismissed.clone()));
        Some(dismissed)
    }

    /// Snooze the active alarm; returns it with its wake time
    pub async fn snooze(&self) -> Option<(Reminder, NaiveDateTime)> {
        let now = self.shared.clock.now();
        let (reminder, until) = self.shared.engine.lock().await.snooze(now)?;
        self.shared.publish(AlarmEvent::Snoozed {
            reminder: reminder.clone(),
            until,
        });
        Some((reminder, until))
    }

    /// Fetch now instead of waiting for the next poll
    pub async fn refresh_now(&self) -> bool {
        self.shared.poller.refresh().await
    }

    /// Run a due check now instead of waiting for the next tick
    pub async fn check_now(&self) -> Option<Reminder> {
        self.shared.check_due().await
    }

    pub async fn preferences(&self) -> NotificationPreferences {
        self.shared.preferences.read().await.clone()
    }

    pub async fn set_preferences(&self, preferences: NotificationPreferences) {
        let mut current = self.shared.preferences.write().await;
        if let Some(sound) = &self.sound {
            sound.apply_preferences(&preferences);
        }
        *current = preferences;
    }

    pub fn shutdown(self) {
        tracing::info!("Stopping alarm monitor");
        // Drop aborts the loops
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ReminderId, ReminderScope, ReminderSource};
    use crate::clock::TokioClock;
    use crate::error::{AppError, Result};
    use crate::services::notifier::{Notifier, QuietHours};
    use async_trait::async_trait;
    use crate::services::presenter::AlarmPresenter;
    use crate::sound::testing::recording_engine;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn reminder(id: i64, at: NaiveDateTime) -> Reminder {
        Reminder {
            id: ReminderId::from(id),
            message: format!("reminder {}", id),
            reminder_time: at,
            event: None,
            account_id: None,
            sent: false,
        }
    }

    struct FixedSource {
        reminders: Vec<Reminder>,
        calls: AtomicUsize,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl ReminderSource for FixedSource {
        async fn list_reminders(&self, _scope: ReminderScope) -> Result<Vec<Reminder>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_after {
                Some(n) if call >= n => Err(AppError::Generic("offline".to_string())),
                _ => Ok(self.reminders.clone()),
            }
        }
    }

    fn source(reminders: Vec<Reminder>) -> Arc<FixedSource> {
        Arc::new(FixedSource {
            reminders,
            calls: AtomicUsize::new(0),
            fail_after: None,
        })
    }

    async fn start(source: Arc<FixedSource>, notifier: Option<AlarmNotifier>) -> MonitorHandle {
        let poller = ReminderPoller::new(source, ReminderScope::Global);
        let clock = Arc::new(TokioClock::starting_at(base()));
        AlarmMonitor::start(poller, clock, notifier, NotificationPreferences::default()).await
    }

    #[derive(Clone, Default)]
    struct SentCounter(Arc<AtomicUsize>);

    #[async_trait]
    impl Notifier for SentCounter {
        async fn request_permission(&self) -> Result<bool> {
            Ok(true)
        }

        async fn notify(&self, _title: &str, _body: &str) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_preferences_reach_sound_engine() {
        let (engine, ctx, _) = recording_engine();
        let engine = Arc::new(engine);
        let src = source(vec![reminder(1, base() + chrono::Duration::seconds(5))]);
        let handle = start(src, None).await.with_sound(Arc::clone(&engine)).await;
        let _presenter = AlarmPresenter::new(Arc::clone(&engine)).spawn(handle.subscribe());

        handle
            .set_preferences(NotificationPreferences {
                sound_enabled: false,
                volume: 0,
                ..NotificationPreferences::default()
            })
            .await;
        assert!(!engine.is_enabled());
        assert_eq!(engine.volume(), 0.0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(handle.active().await.is_some());
        assert_eq!(ctx.voice_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_sound_applies_current_preferences() {
        let (engine, _, _) = recording_engine();
        let engine = Arc::new(engine);
        let poller = ReminderPoller::new(source(Vec::new()), ReminderScope::Global);
        let prefs = NotificationPreferences {
            volume: 40,
            ..NotificationPreferences::default()
        };

        let _handle = AlarmMonitor::start(poller, Arc::new(TokioClock::starting_at(base())), None, prefs)
            .await
            .with_sound(Arc::clone(&engine))
            .await;

        assert!((engine.volume() - 0.4).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_start_and_every_thirty_seconds() {
        let src = source(Vec::new());
        let _handle = start(src.clone(), None).await;
        assert_eq!(src.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(src.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_keeps_list_and_loop_alive() {
        let src = Arc::new(FixedSource {
            reminders: vec![reminder(1, base() + chrono::Duration::hours(1))],
            calls: AtomicUsize::new(0),
            fail_after: Some(1),
        });
        let handle = start(src.clone(), None).await;

        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(src.calls.load(Ordering::SeqCst), 4);
        assert_eq!(handle.reminders().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_reminder_raised_within_one_tick() {
        let src = source(vec![reminder(1, base() + chrono::Duration::seconds(5))]);
        let handle = start(src, None).await;
        let mut events = handle.subscribe();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.active().await.is_none());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.active().await.unwrap().id, ReminderId::from(1));

        match events.recv().await.unwrap() {
            AlarmEvent::Raised { reminder, sound } => {
                assert_eq!(reminder.id, ReminderId::from(1));
                assert_eq!(sound, SoundId::Default);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_snooze_broadcasts_wake_time() {
        let src = source(vec![reminder(1, base())]);
        let handle = start(src, None).await;
        let mut events = handle.subscribe();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let (_, until) = handle.snooze().await.unwrap();
        assert_eq!(until, base() + chrono::Duration::seconds(301));

        // The Raised event from the first tick comes first
        let mut saw_snooze = false;
        while let Ok(event) = events.try_recv() {
            if let AlarmEvent::Snoozed { until: at, .. } = event {
                assert_eq!(at, until);
                saw_snooze = true;
            }
        }
        assert!(saw_snooze);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_respects_preferences() {
        let counter = SentCounter::default();
        let notifier = AlarmNotifier::new(Box::new(counter.clone()));
        let src = source(vec![reminder(1, base() + chrono::Duration::seconds(5))]);
        let handle = start(src, Some(notifier)).await;

        // Quiet hours cover noon
        let prefs = NotificationPreferences {
            quiet_hours: Some(QuietHours::new(
                chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                chrono::NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            )),
            ..NotificationPreferences::default()
        };
        handle.set_preferences(prefs).await;

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(handle.active().await.is_some());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_called_outside_quiet_hours() {
        let counter = SentCounter::default();
        let notifier = AlarmNotifier::new(Box::new(counter.clone()));
        let src = source(vec![reminder(1, base() + chrono::Duration::seconds(5))]);
        let _handle = start(src, Some(notifier)).await;

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_loops() {
        let src = source(Vec::new());
        let handle = start(src.clone(), None).await;
        handle.shutdown();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(src.calls.load(Ordering::SeqCst), 1);
    }
}
