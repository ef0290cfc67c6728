use serde::Deserialize;

use crate::envelope::{Envelope, EnvelopeParams};
use crate::theory::Pitch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Square,
    Sine,
    Saw,
    Triangle,
}

impl Waveform {
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
            Waveform::Saw => 2.0 * (phase - 0.5),
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        }
    }
}

/// One sounding pitch: an oscillator behind its own envelope.
pub struct Voice {
    pitch: Pitch,
    frequency: f32,
    waveform: Waveform,
    phase: f32,
    envelope: Envelope,
}

impl Voice {
    /// `gate_length` is the number of samples after which the voice
    /// releases itself; `None` holds it until [`Voice::release`].
    pub fn new(pitch: Pitch, waveform: Waveform, gate_length: Option<u64>) -> Self {
        Self {
            pitch,
            frequency: pitch.frequency(),
            waveform,
            phase: 0.0,
            envelope: Envelope::open(gate_length),
        }
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn release(&mut self) {
        self.envelope.release();
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.is_releasing()
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_idle()
    }

    pub fn sample(&mut self, sample_rate: f32, params: &EnvelopeParams) -> f32 {
        let phase_delta = self.frequency / sample_rate;
        self.phase = (self.phase + phase_delta).fract();
        let level = self.envelope.advance(1.0 / sample_rate, params);
        self.waveform.sample(self.phase) * level
    }
}
