//! Integration tests for the alarm monitor
//!
//! These tests drive the full pipeline with virtual time:
//! - poller and due-check loops against a fake backend
//! - snooze / dismiss lifecycle
//! - presenter ringing through a recording audio context

use alarm_monitor::api::{NotificationPreferences, Reminder, ReminderId, ReminderScope, ReminderSource};
use alarm_monitor::clock::TokioClock;
use alarm_monitor::error::Result;
use alarm_monitor::services::{AlarmEvent, AlarmMonitor, AlarmPresenter, MonitorHandle, ReminderPoller};
use alarm_monitor::sound::{AudioContext, ContextState, SoundEngine, SoundId, Voice};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fire time of the first reminder in each scenario
fn t() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn reminder(id: i64, at: NaiveDateTime) -> Reminder {
    Reminder {
        id: ReminderId::from(id),
        message: format!("Reminder {}", id),
        reminder_time: at,
        event: None,
        account_id: Some(1),
        sent: false,
    }
}

/// Backend whose reminder list tests can swap at any time
#[derive(Clone, Default)]
struct FakeBackend {
    reminders: Arc<Mutex<Vec<Reminder>>>,
}

impl FakeBackend {
    fn with(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: Arc::new(Mutex::new(reminders)),
        }
    }

    fn set(&self, reminders: Vec<Reminder>) {
        *self.reminders.lock().unwrap() = reminders;
    }
}

#[async_trait]
impl ReminderSource for FakeBackend {
    async fn list_reminders(&self, _scope: ReminderScope) -> Result<Vec<Reminder>> {
        Ok(self.reminders.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct RecordingContext {
    plays: Mutex<Vec<Vec<Voice>>>,
    running: Mutex<bool>,
}

impl RecordingContext {
    fn play_count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }

    fn voice_count(&self) -> usize {
        self.plays.lock().unwrap().iter().map(Vec::len).sum()
    }
}

impl AudioContext for RecordingContext {
    fn state(&self) -> ContextState {
        if *self.running.lock().unwrap() {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    fn resume(&self) -> Result<()> {
        *self.running.lock().unwrap() = true;
        Ok(())
    }

    fn play(&self, voices: &[Voice]) -> Result<()> {
        self.plays.lock().unwrap().push(voices.to_vec());
        Ok(())
    }
}

fn recording_engine() -> (Arc<SoundEngine>, Arc<RecordingContext>) {
    let ctx = Arc::new(RecordingContext::default());
    let factory_ctx = Arc::clone(&ctx);
    let engine = SoundEngine::new(Box::new(move || -> Result<Arc<dyn AudioContext>> {
        Ok(factory_ctx.clone() as Arc<dyn AudioContext>)
    }));
    (Arc::new(engine), ctx)
}

/// Start a monitor whose clock reads `start` at virtual time zero
async fn start_monitor(backend: FakeBackend, start: NaiveDateTime) -> MonitorHandle {
    let poller = ReminderPoller::new(Arc::new(backend), ReminderScope::Account(1));
    let clock = Arc::new(TokioClock::starting_at(start));
    AlarmMonitor::start(poller, clock, None, NotificationPreferences::default()).await
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn test_snooze_then_dismiss_lifecycle() {
    let backend = FakeBackend::with(vec![reminder(1, t())]);
    // Due checks land at T-5s, T+5s, T+15s, ...
    let monitor = start_monitor(backend, t() - ChronoDuration::seconds(5)).await;

    advance(1).await;
    assert!(monitor.active().await.is_none());

    // T+5s: shown
    advance(10).await;
    assert_eq!(monitor.active().await.unwrap().id, ReminderId::from(1));

    let (_, until) = monitor.snooze().await.unwrap();
    let expected = t() + ChronoDuration::seconds(6);
    assert!((until - (expected + ChronoDuration::minutes(5))).num_seconds().abs() <= 1);
    assert!(monitor.active().await.is_none());

    // Not before the snooze expires
    advance(290).await;
    assert!(monitor.active().await.is_none());

    // Within one tick after it expires
    advance(20).await;
    assert_eq!(monitor.active().await.unwrap().id, ReminderId::from(1));

    monitor.dismiss().await.unwrap();

    // Never again this session
    advance(3_600).await;
    assert!(monitor.active().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_two_due_reminders_surface_one_at_a_time() {
    let backend = FakeBackend::with(vec![
        reminder(1, t()),
        reminder(2, t() + ChronoDuration::seconds(2)),
    ]);
    let monitor = start_monitor(backend, t() - ChronoDuration::seconds(5)).await;
    let mut events = monitor.subscribe();

    // T+5s: both are due, list order decides
    advance(11).await;
    assert_eq!(monitor.active().await.unwrap().id, ReminderId::from(1));

    // Still the first one while it is shown
    advance(10).await;
    assert_eq!(monitor.active().await.unwrap().id, ReminderId::from(1));

    monitor.dismiss().await.unwrap();
    advance(10).await;
    assert_eq!(monitor.active().await.unwrap().id, ReminderId::from(2));

    let raised: Vec<ReminderId> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            AlarmEvent::Raised { reminder, .. } => Some(reminder.id),
            _ => None,
        })
        .collect();
    assert_eq!(raised, vec![ReminderId::from(1), ReminderId::from(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_new_reminder_picked_up_by_next_poll() {
    let backend = FakeBackend::default();
    let monitor = start_monitor(backend.clone(), t() - ChronoDuration::seconds(20)).await;

    // Created on the backend after the initial fetch, due at T
    backend.set(vec![reminder(7, t())]);

    // T: due, but the list has not been refreshed yet
    advance(21).await;
    assert!(monitor.active().await.is_none());

    // Poll at T+10s, due check at T+10s or T+20s
    advance(20).await;
    assert_eq!(monitor.active().await.unwrap().id, ReminderId::from(7));
}

#[tokio::test(start_paused = true)]
async fn test_overdue_at_start_is_skipped() {
    let backend = FakeBackend::with(vec![reminder(1, t())]);
    let monitor = start_monitor(backend, t() + ChronoDuration::minutes(2)).await;

    advance(60).await;
    assert!(monitor.active().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_presenter_rings_until_dismissed() {
    let (sound, ctx) = recording_engine();
    let backend = FakeBackend::with(vec![reminder(1, t())]);
    let monitor = start_monitor(backend, t() - ChronoDuration::seconds(5)).await;
    let _presenter = AlarmPresenter::new(Arc::clone(&sound)).spawn(monitor.subscribe());

    // Raised at +10s, rings at +10, +13, +16, +19
    advance(20).await;
    assert_eq!(ctx.play_count(), 4);

    monitor.dismiss().await.unwrap();
    advance(30).await;
    assert_eq!(ctx.play_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_sound_rings_silently() {
    let (sound, ctx) = recording_engine();
    sound.set_enabled(false);
    let backend = FakeBackend::with(vec![reminder(1, t())]);
    let monitor = start_monitor(backend, t() - ChronoDuration::seconds(5)).await;
    let _presenter = AlarmPresenter::new(Arc::clone(&sound)).spawn(monitor.subscribe());

    advance(20).await;
    assert!(monitor.active().await.is_some());
    assert_eq!(ctx.voice_count(), 0);
}

#[test]
fn test_play_none_builds_no_voices() {
    let (sound, ctx) = recording_engine();

    sound.play(SoundId::None);
    sound.preview(SoundId::None, 100);
    assert_eq!(ctx.voice_count(), 0);

    sound.play(SoundId::Chime);
    assert_eq!(ctx.voice_count(), SoundId::Chime.voices().len());
}
