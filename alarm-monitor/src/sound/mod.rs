//! Sound engine
//!
//! Plays synthesized alarm tones. One audio context per engine is created
//! lazily on the first audible playback and resumed whenever it is found
//! suspended. `volume` and `enabled` follow the user's notification
//! preferences.

pub mod context;
pub mod presets;
pub mod synth;

pub use context::{AudioContext, CommandContext, ContextState, NullContext};
pub use presets::{SoundId, Voice, Waveform};

use crate::api::NotificationPreferences;
use crate::config::MAX_VOLUME_PERCENT;
use crate::error::Result;
use std::sync::{Arc, Mutex};

/// Builds the audio context on first use
pub type ContextFactory = Box<dyn Fn() -> Result<Arc<dyn AudioContext>> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct SoundState {
    volume: f32,
    enabled: bool,
}

pub struct SoundEngine {
    factory: ContextFactory,
    context: Mutex<Option<Arc<dyn AudioContext>>>,
    state: Mutex<SoundState>,
}

fn percent_to_volume(percent: u8) -> f32 {
    f32::from(percent.min(MAX_VOLUME_PERCENT)) / f32::from(MAX_VOLUME_PERCENT)
}

impl SoundEngine {
    pub fn new(factory: ContextFactory) -> Self {
        Self {
            factory,
            context: Mutex::new(None),
            state: Mutex::new(SoundState {
                volume: percent_to_volume(crate::config::DEFAULT_VOLUME_PERCENT),
                enabled: true,
            }),
        }
    }

    /// Engine backed by an external player command, or silent if `None`
    pub fn with_player(command_line: Option<String>) -> Self {
        Self::new(Box::new(move || -> Result<Arc<dyn AudioContext>> {
            match command_line.as_deref() {
                Some(cmd) if !cmd.trim().is_empty() => {
                    Ok(Arc::new(CommandContext::from_command_line(cmd)?))
                }
                _ => Ok(Arc::new(NullContext::default())),
            }
        }))
    }

    fn state(&self) -> SoundState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn volume(&self) -> f32 {
        self.state().volume
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    pub fn set_volume_percent(&self, percent: u8) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).volume = percent_to_volume(percent);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).enabled = enabled;
    }

    pub fn apply_preferences(&self, prefs: &NotificationPreferences) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.volume = percent_to_volume(prefs.volume);
        state.enabled = prefs.sound_enabled;
        tracing::debug!(
            "Sound preferences applied: enabled={}, volume={:.2}",
            state.enabled,
            state.volume
        );
    }

    /// Get the context, creating and resuming it as needed
    fn ensure_context(&self) -> Result<Arc<dyn AudioContext>> {
        let mut slot = self.context.lock().unwrap_or_else(|e| e.into_inner());

        let context = match slot.as_ref() {
            Some(context) => Arc::clone(context),
            None => {
                let context = (self.factory)()?;
                *slot = Some(Arc::clone(&context));
                tracing::debug!("Audio context created");
                context
            }
        };

        if context.state() == ContextState::Suspended {
            context.resume()?;
        }

        Ok(context)
    }

    fn try_play(&self, id: SoundId, volume: f32) -> Result<()> {
        let voices: Vec<Voice> = id
            .voices()
            .into_iter()
            .map(|mut voice| {
                voice.gain *= volume;
                voice
            })
            .collect();

        self.ensure_context()?.play(&voices)
    }

    /// Play a sound once. Failures are logged, never returned.
    pub fn play(&self, id: SoundId) {
        let state = self.state();
        if !state.enabled || id == SoundId::None {
            return;
        }

        if let Err(e) = self.try_play(id, state.volume) {
            tracing::warn!("Failed to play sound '{}': {}", id, e);
        }
    }

    /// Play once at `volume_percent`, then restore the previous volume.
    ///
    /// Overlapping previews can restore each other's volume out of order.
    pub fn preview(&self, id: SoundId, volume_percent: u8) {
        let previous = self.volume();
        self.set_volume_percent(volume_percent);
        self.play(id);
        self.state.lock().unwrap_or_else(|e| e.into_inner()).volume = previous;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every playback instead of making noise
    #[derive(Default)]
    pub struct RecordingContext {
        pub plays: Mutex<Vec<Vec<Voice>>>,
        pub resumes: Mutex<usize>,
        running: Mutex<bool>,
    }

    impl RecordingContext {
        pub fn voice_count(&self) -> usize {
            self.plays.lock().unwrap().iter().map(Vec::len).sum()
        }

        pub fn suspend(&self) {
            *self.running.lock().unwrap() = false;
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
            *self.resumes.lock().unwrap() += 1;
            *self.running.lock().unwrap() = true;
            Ok(())
        }

        fn play(&self, voices: &[Voice]) -> Result<()> {
            self.plays.lock().unwrap().push(voices.to_vec());
            Ok(())
        }
    }

    /// Engine wired to a shared recording context, plus a creation counter
    pub fn recording_engine() -> (SoundEngine, Arc<RecordingContext>, Arc<Mutex<usize>>) {
        let ctx = Arc::new(RecordingContext::default());
        let created = Arc::new(Mutex::new(0));

        let factory_ctx = Arc::clone(&ctx);
        let factory_created = Arc::clone(&created);
        let engine = SoundEngine::new(Box::new(move || -> Result<Arc<dyn AudioContext>> {
            *factory_created.lock().unwrap() += 1;
            Ok(factory_ctx.clone() as Arc<dyn AudioContext>)
        }));

        (engine, ctx, created)
    }
}
