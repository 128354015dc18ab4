//! Oscillator rendering
//!
//! Mixes a voice list into mono f32 samples and encodes them as a
//! 16-bit PCM WAV container for external players.

use crate::sound::presets::{Voice, Waveform};
use std::f32::consts::TAU;

/// Gain an exponential decay ends at, relative to the voice's peak
const DECAY_FLOOR: f32 = 0.001;

fn oscillator(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

/// Gain at `t` seconds into a voice
fn envelope(voice: &Voice, t: f32) -> f32 {
    if t < 0.0 || t > voice.duration {
        return 0.0;
    }
    if voice.attack > 0.0 && t < voice.attack {
        return voice.gain * t / voice.attack;
    }

    let decay_len = (voice.duration - voice.attack).max(f32::EPSILON);
    let progress = ((t - voice.attack) / decay_len).clamp(0.0, 1.0);
    voice.gain * DECAY_FLOOR.powf(progress)
}

/// Instantaneous frequency at `t` seconds into a voice
fn frequency(voice: &Voice, t: f32) -> f32 {
    match voice.end_frequency {
        Some(end) if voice.duration > 0.0 => {
            let progress = (t / voice.duration).clamp(0.0, 1.0);
            voice.frequency * (end / voice.frequency).powf(progress)
        }
        _ => voice.frequency,
    }
}

/// Mix voices into mono samples at `sample_rate`, scaled by `volume`.
pub fn render(voices: &[Voice], volume: f32, sample_rate: u32) -> Vec<f32> {
    let total = voices.iter().map(Voice::end).fold(0.0_f32, f32::max);
    let len = (total * sample_rate as f32).ceil() as usize;
    let mut out = vec![0.0_f32; len];
    let dt = 1.0 / sample_rate as f32;

    for voice in voices {
        let first = (voice.start * sample_rate as f32).floor() as usize;
        let last = ((voice.end() * sample_rate as f32).ceil() as usize).min(len);
        let mut phase = 0.0_f32;

        for (i, sample) in out.iter_mut().enumerate().take(last).skip(first) {
            let t = i as f32 * dt - voice.start;
            *sample += oscillator(voice.waveform, phase) * envelope(voice, t) * volume;
            phase = (phase + frequency(voice, t) * dt).fract();
        }
    }

    for sample in &mut out {
        *sample = sample.clamp(-1.0, 1.0);
    }
    out
}

/// Encode mono samples as a 16-bit PCM WAV file
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS_PER_SAMPLE: u16 = 16;

    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = (samples.len() * usize::from(block_align)) as u32;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        let pcm = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        wav.extend_from_slice(&pcm.to_le_bytes());
    }

    wav
}
