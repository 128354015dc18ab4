//! Alarm sound presets
//!
//! Each preset is a small oscillator graph: a list of voices with their own
//! waveform, pitch, and gain envelope. Nothing is loaded from disk.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
}

/// One oscillator with its gain envelope.
///
/// Times are seconds relative to the start of the playback. Gain rises
/// linearly over `attack` and then decays exponentially until `start + duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub waveform: Waveform,
    pub start: f32,
    pub duration: f32,
    pub frequency: f32,
    /// Exponential pitch ramp target reached at the end of the voice
    pub end_frequency: Option<f32>,
    /// Peak gain before master volume, 0.0-1.0
    pub gain: f32,
    pub attack: f32,
}

impl Voice {
    fn tone(waveform: Waveform, start: f32, duration: f32, frequency: f32, gain: f32) -> Self {
        Self {
            waveform,
            start,
            duration,
            frequency,
            end_frequency: None,
            gain,
            attack: 0.01,
        }
    }

    fn sweep(mut self, end_frequency: f32) -> Self {
        self.end_frequency = Some(end_frequency);
        self
    }

    fn soft(mut self, attack: f32) -> Self {
        self.attack = attack;
        self
    }

    pub fn end(&self) -> f32 {
        self.start + self.duration
    }
}

/// Alarm sound identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundId {
    #[default]
    Default,
    Chime,
    Bell,
    Ping,
    Pop,
    Ding,
    Alert,
    Gentle,
    None,
}

impl SoundId {
    pub const ALL: [SoundId; 9] = [
        SoundId::Default,
        SoundId::Chime,
        SoundId::Bell,
        SoundId::Ping,
        SoundId::Pop,
        SoundId::Ding,
        SoundId::Alert,
        SoundId::Gentle,
        SoundId::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SoundId::Default => "default",
            SoundId::Chime => "chime",
            SoundId::Bell => "bell",
            SoundId::Ping => "ping",
            SoundId::Pop => "pop",
            SoundId::Ding => "ding",
            SoundId::Alert => "alert",
            SoundId::Gentle => "gentle",
            SoundId::None => "none",
        }
    }

    /// Oscillator graph for this sound
    pub fn voices(self) -> Vec<Voice> {
        use Waveform::*;

        match self {
            SoundId::Default => vec![
                Voice::tone(Sine, 0.0, 0.15, 880.0, 0.5),
                Voice::tone(Sine, 0.2, 0.15, 880.0, 0.5),
            ],
            // C5 E5 G5 arpeggio
            SoundId::Chime => vec![
                Voice::tone(Sine, 0.0, 0.6, 523.25, 0.4),
                Voice::tone(Sine, 0.15, 0.6, 659.25, 0.4),
                Voice::tone(Sine, 0.3, 0.8, 783.99, 0.4),
            ],
            // Fundamental plus inharmonic partials
            SoundId::Bell => vec![
                Voice::tone(Sine, 0.0, 1.5, 830.0, 0.5),
                Voice::tone(Sine, 0.0, 1.0, 1_660.0, 0.2),
                Voice::tone(Sine, 0.0, 0.6, 2_490.0, 0.1),
            ],
            SoundId::Ping => vec![Voice::tone(Sine, 0.0, 0.25, 1_200.0, 0.5)],
            SoundId::Pop => vec![Voice::tone(Triangle, 0.0, 0.1, 600.0, 0.6).sweep(150.0)],
            // C6 with an octave overtone
            SoundId::Ding => vec![
                Voice::tone(Sine, 0.0, 0.8, 1_046.5, 0.5),
                Voice::tone(Sine, 0.0, 0.4, 2_093.0, 0.15),
            ],
            SoundId::Alert => vec![
                Voice::tone(Square, 0.0, 0.12, 880.0, 0.3),
                Voice::tone(Square, 0.16, 0.12, 660.0, 0.3),
                Voice::tone(Square, 0.32, 0.12, 880.0, 0.3),
            ],
            SoundId::Gentle => vec![
                Voice::tone(Sine, 0.0, 1.0, 440.0, 0.3).soft(0.15),
                Voice::tone(Triangle, 0.1, 1.0, 554.37, 0.2).soft(0.2),
            ],
            SoundId::None => Vec::new(),
        }
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        SoundId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AppError::Config(format!("Unknown sound id '{}'", s)))
    }
}
