//! Alarm presenter
//!
//! Rings the active alarm: plays its sound when raised and again every
//! 3 seconds until it is dismissed or snoozed.

use crate::api::ReminderId;
use crate::config::ALARM_SOUND_REPEAT;
use crate::services::monitor::AlarmEvent;
use crate::sound::{SoundEngine, SoundId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub struct AlarmPresenter {
    sound: Arc<SoundEngine>,
    repeat: Duration,
}

impl AlarmPresenter {
    pub fn new(sound: Arc<SoundEngine>) -> Self {
        Self {
            sound,
            repeat: ALARM_SOUND_REPEAT,
        }
    }

    /// Ring alarms from `events` until the channel closes
    pub fn spawn(self, mut events: broadcast::Receiver<AlarmEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ringing: Option<(ReminderId, SoundId)> = None;
            let mut ticker = tokio::time::interval_at(Instant::now() + self.repeat, self.repeat);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(AlarmEvent::Raised { reminder, sound }) => {
                            tracing::debug!("Ringing alarm for reminder {}", reminder.id);
                            self.sound.play(sound);
                            ticker.reset();
                            ringing = Some((reminder.id, sound));
                        }
                        Ok(AlarmEvent::Dismissed(reminder))
                        | Ok(AlarmEvent::Snoozed { reminder, .. }) => {
                            if ringing.as_ref().is_some_and(|(id, _)| *id == reminder.id) {
                                ringing = None;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            // Skipped events may include the dismissal
                            tracing::warn!("Alarm presenter skipped {} events, silencing", skipped);
                            ringing = None;
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = ticker.tick(), if ringing.is_some() => {
                        if let Some((_, sound)) = &ringing {
                            self.sound.play(*sound);
                        }
                    }
                }
            }

            tracing::debug!("Alarm presenter stopped");
        })
    }
}
