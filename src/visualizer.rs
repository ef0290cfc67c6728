use macroquad::prelude::*;

use crate::draw::{AMBER, AMBER_DIM};

/// Linear map of `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    if (in_max - in_min).abs() < f32::EPSILON {
        return out_min;
    }
    out_min + (value - in_min) / (in_max - in_min) * (out_max - out_min)
}

/// Scope trace points. Sample index spans the surface width; amplitude
/// `[-1, 1]` spans the middle half of its height.
pub fn waveform_points(samples: &[f32], surface: Rect) -> Vec<Vec2> {
    let last = samples.len().saturating_sub(1) as f32;
    let mid = surface.h / 2.0;
    let band = surface.h / 4.0;
    samples
        .iter()
        .enumerate()
        .map(|(index, amplitude)| {
            let x = map_range(index as f32, 0.0, last, 0.0, surface.w);
            let y = map_range(*amplitude, -1.0, 1.0, mid - band, mid + band);
            vec2(surface.x + x, surface.y + y)
        })
        .collect()
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum = samples.iter().map(|s| s * s).sum::<f32>();
    (sum / samples.len() as f32).sqrt()
}

/// Center and diameter of the loudness circle; diameter grows linearly with RMS.
pub fn amplitude_circle(samples: &[f32], surface: Rect) -> (Vec2, f32) {
    let center = surface.center();
    let diameter = rms(samples) * surface.w.min(surface.h);
    (center, diameter)
}

pub struct Visualizer {
    surface: Rect,
    show_circle: bool,
}

impl Visualizer {
    pub fn new(surface: Rect, show_circle: bool) -> Self {
        Self {
            surface,
            show_circle,
        }
    }

    #[cfg(test)]
    pub fn surface(&self) -> Rect {
        self.surface
    }

    /// Re-derives the drawing surface; returns true when it changed.
    pub fn resize(&mut self, surface: Rect) -> bool {
        if surface == self.surface {
            return false;
        }
        log::debug!(
            "scope resized to {:.0}x{:.0}",
            surface.w,
            surface.h
        );
        self.surface = surface;
        true
    }

    pub fn draw(&self, samples: &[f32]) {
        let points = waveform_points(samples, self.surface);
        if points.len() >= 2 {
            for pair in points.windows(2) {
                draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, 1.5, AMBER);
            }
            // Closed path, joining the last sample back to the first.
            let (first, last) = (points[0], points[points.len() - 1]);
            draw_line(last.x, last.y, first.x, first.y, 1.0, AMBER_DIM);
        }
        if self.show_circle {
            let (center, diameter) = amplitude_circle(samples, self.surface);
            if diameter > 0.5 {
                draw_circle_lines(center.x, center.y, diameter * 0.5, 1.5, AMBER_DIM);
            }
        }
    }
}
