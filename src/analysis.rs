use std::sync::{Arc, Mutex};

pub type SharedTap = Arc<Mutex<AnalysisTap>>;

/// Ring buffer of the most recent output samples, read by the scope.
pub struct AnalysisTap {
    buffer: Vec<f32>,
    cursor: usize,
}

impl AnalysisTap {
    pub fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(2)],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn push(&mut self, value: f32) {
        if let Some(slot) = self.buffer.get_mut(self.cursor) {
            *slot = value;
        }
        self.cursor = (self.cursor + 1) % self.buffer.len();
    }

    /// Copies the buffer oldest-first into `out`, which is resized to fit.
    /// Slots not yet written read as silence.
    pub fn snapshot_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend_from_slice(&self.buffer[self.cursor..]);
        out.extend_from_slice(&self.buffer[..self.cursor]);
    }
}
