//! Mono Schroeder reverb: parallel damped combs into series allpasses.

const COMB_TUNING: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNING: [usize; 2] = [556, 441];
const TUNING_RATE: f32 = 44_100.0;
const ROOM_FEEDBACK: f32 = 0.84;
const DAMPING: f32 = 0.2;
const ALLPASS_FEEDBACK: f32 = 0.5;

/// Feedback comb with a one-pole lowpass in the loop.

struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    filterstore: f32,
}

impl CombFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            filterstore: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filterstore = output * (1.0 - DAMPING) + self.filterstore * DAMPING;
        self.buffer[self.index] = input + self.filterstore * ROOM_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }
}

pub struct Reverb {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
    mix: f32,
}

impl Reverb {
    /// Delay lines are tuned at 44.1 kHz and scaled to `sample_rate`.
    /// `mix` is the wet share, clamped to `[0, 1]`.
    pub fn new(sample_rate: f32, mix: f32) -> Self {
        let scale = sample_rate / TUNING_RATE;
        Self {
            combs: COMB_TUNING
                .iter()
                .map(|len| CombFilter::new((*len as f32 * scale) as usize))
                .collect(),
            allpasses: ALLPASS_TUNING
                .iter()
                .map(|len| AllpassFilter::new((*len as f32 * scale) as usize))
                .collect(),
            mix: mix.clamp(0.0, 1.0),
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.mix <= 0.0
    }

    /// One mono sample in, one out. Bypassed reverbs return the input as is.
    pub fn process(&mut self, input: f32) -> f32 {
        if self.is_bypassed() {
            return input;
        }
        let mut wet = self
            .combs
            .iter_mut()
            .map(|comb| comb.process(input))
            .sum::<f32>()
            / self.combs.len() as f32;
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        input * (1.0 - self.mix) + wet * self.mix
    }
}
