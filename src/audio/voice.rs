use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

#[cfg(feature = "playback")]
use rodio::Source;
#[cfg(feature = "playback")]
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 44100;

/// Linear fade-in length.
pub const LINEAR_RAMP_SECS: f64 = 0.05;
/// Exponential fade-in length and its starting gain.
pub const EXP_RAMP_SECS: f64 = 0.1;
pub const EXP_RAMP_FLOOR: f64 = 0.001;

/// Peak amplitude of one voice; four voices sum without clipping.
const VOICE_AMPLITUDE: f64 = 0.25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Square,
    Sawtooth,
    Triangle,
    // Unknown names fall back to sine.
    #[default]
    #[serde(other)]
    Sine,
}

impl Waveform {
    /// Sample at `phase` cycles (only the fractional part matters), in -1..=1.
    pub fn sample(&self, phase: f64) -> f64 {
        let p = phase.rem_euclid(1.0);
        match self {
            Waveform::Sine => (TAU * p).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => {
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
        }
    }
}

/// Gain envelope applied at the start of a tone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Linear,
    #[serde(rename = "exp")]
    Exponential,
    #[default]
    #[serde(other)]
    None,
}

impl Transition {
    pub fn gain_at(&self, elapsed_secs: f64) -> f64 {
        let t = elapsed_secs.max(0.0);
        match self {
            Transition::None => 1.0,
            Transition::Linear => (t / LINEAR_RAMP_SECS).min(1.0),
            Transition::Exponential => {
                if t >= EXP_RAMP_SECS {
                    1.0
                } else {
                    EXP_RAMP_FLOOR * (1.0 / EXP_RAMP_FLOOR).powf(t / EXP_RAMP_SECS)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tone {
    pub frequency_hz: f32,
    pub waveform: Waveform,
    pub transition: Transition,
}

impl Tone {
    /// Plain square wave as used by the pattern and Morse previews.
    pub fn square(frequency_hz: f32) -> Self {
        Self {
            frequency_hz,
            waveform: Waveform::Square,
            transition: Transition::None,
        }
    }
}

/// Endless mono oscillator for one tone. Playback length is decided by
/// whoever schedules it.
pub struct Voice {
    tone: Tone,
    sample_rate: u32,
    num_sample: u64,
}

impl Voice {
    pub fn new(tone: Tone) -> Self {
        Self {
            tone,
            sample_rate: SAMPLE_RATE,
            num_sample: 0,
        }
    }
}

impl Iterator for Voice {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let t = self.num_sample as f64 / self.sample_rate as f64;
        self.num_sample = self.num_sample.wrapping_add(1);

        let phase = self.tone.frequency_hz as f64 * t;
        let sample = self.tone.waveform.sample(phase) * self.tone.transition.gain_at(t);

        Some((sample * VOICE_AMPLITUDE) as f32)
    }
}

#[cfg(feature = "playback")]
impl Source for Voice {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
