//! Per-voice amplitude gate. The level ramps up linearly while the gate is
//! open and back down once it closes; a gate may carry a length after which
//! it closes by itself.

const MIN_RAMP_SECS: f32 = 0.0001;

#[derive(Clone, Copy, Debug)]
pub struct EnvelopeParams {
    /// Seconds from silence to full level.
    pub fade_in: f32,
    /// Seconds from full level to silence.
    pub fade_out: f32,
}

impl Default for EnvelopeParams {
    /// Near-instant on, short fade so stops don't click.
    fn default() -> Self {
        Self {
            fade_in: 0.005,
            fade_out: 0.03,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    Open,
    Closed,
}

#[derive(Clone, Debug)]
pub struct Envelope {
    level: f32,
    gate: Gate,
    /// Samples left before the gate closes on its own.
    closes_in: Option<u64>,
}

impl Envelope {
    /// Opens a gate that stays open until [`Envelope::release`], or for
    /// `length` samples when one is given.
    pub fn open(length: Option<u64>) -> Self {
        Self {
            level: 0.0,
            gate: Gate::Open,
            closes_in: length,
        }
    }

    pub fn release(&mut self) {
        self.gate = Gate::Closed;
        self.closes_in = None;
    }

    pub fn is_releasing(&self) -> bool {
        self.gate == Gate::Closed
    }

    pub fn is_idle(&self) -> bool {
        self.gate == Gate::Closed && self.level <= 0.0
    }

    /// Moves one sample of `dt` seconds and returns the new level.
    pub fn advance(&mut self, dt: f32, params: &EnvelopeParams) -> f32 {
        match self.closes_in {
            Some(0) => self.release(),
            Some(left) => self.closes_in = Some(left - 1),
            None => {}
        }
        self.level = match self.gate {
            Gate::Open => (self.level + dt / params.fade_in.max(MIN_RAMP_SECS)).min(1.0),
            Gate::Closed => (self.level - dt / params.fade_out.max(MIN_RAMP_SECS)).max(0.0),
        };
        self.level
    }
}
