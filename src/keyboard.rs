use std::collections::HashMap;

use macroquad::prelude::*;

use crate::draw::{draw_key, KEY_FONT_SIZE};
use crate::theory::{Note, Octave, Pitch};

pub const LOWEST_OCTAVE: Octave = Octave::new(2);
pub const HIGHEST_OCTAVE: Octave = Octave::new(7);

pub struct KeyWidget {
    pub pitch: Pitch,
    pub rect: Rect,
    pub active: bool,
}

/// The on-screen piano: one widget per pitch from C of the lowest octave to
/// B of the highest.
pub struct KeyWidgets {
    keys: Vec<KeyWidget>,
    index: HashMap<Pitch, usize>,
}

impl KeyWidgets {
    pub fn new(lowest: Octave, highest: Octave) -> Self {
        let mut keys = Vec::new();
        for octave in lowest.value()..=highest.value() {
            for step in 0..Note::COUNT {
                let note = Note::from_index(Note::ROOT.index() + step);
                keys.push(KeyWidget {
                    pitch: Pitch::new(note, Octave::new(octave)),
                    rect: Rect::new(0.0, 0.0, 0.0, 0.0),
                    active: false,
                });
            }
        }
        let index = keys
            .iter()
            .enumerate()
            .map(|(position, key)| (key.pitch, position))
            .collect();
        Self { keys, index }
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        self.index.contains_key(&pitch)
    }

    /// Marks the widget for `pitch`; false when there is no such widget.
    pub fn set_active(&mut self, pitch: Pitch, active: bool) -> bool {
        match self.index.get(&pitch) {
            Some(position) => {
                self.keys[*position].active = active;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_active(&self, pitch: Pitch) -> bool {
        self.index
            .get(&pitch)
            .map(|position| self.keys[*position].active)
            .unwrap_or(false)
    }

    pub fn keys(&self) -> &[KeyWidget] {
        &self.keys
    }

    pub fn layout(&mut self, area: Rect) {
        let white_count = self.keys.iter().filter(|key| !key.pitch.note.is_sharp()).count();
        if white_count == 0 {
            return;
        }
        let white_w = area.w / white_count as f32;
        let black_w = white_w * 0.6;
        let black_h = area.h * 0.6;
        let mut white_index = 0usize;
        for key in &mut self.keys {
            if key.pitch.note.is_sharp() {
                // Sits on the boundary after the previous white key.
                let boundary = area.x + white_index as f32 * white_w;
                key.rect = Rect::new(boundary - black_w * 0.5, area.y, black_w, black_h);
            } else {
                key.rect = Rect::new(area.x + white_index as f32 * white_w, area.y, white_w, area.h);
                white_index += 1;
            }
        }
    }

    pub fn hit_test(&self, point: Vec2) -> Option<Pitch> {
        let black = self
            .keys
            .iter()
            .filter(|key| key.pitch.note.is_sharp())
            .find(|key| key.rect.contains(point));
        let white = || {
            self.keys
                .iter()
                .filter(|key| !key.pitch.note.is_sharp())
                .find(|key| key.rect.contains(point))
        };
        black.or_else(white).map(|key| key.pitch)
    }

    pub fn draw(&self) {
        for key in self.keys.iter().filter(|key| !key.pitch.note.is_sharp()) {
            let label = if key.pitch.note == Note::ROOT {
                key.pitch.to_string()
            } else {
                String::new()
            };
            draw_key(key.rect, key.active, false, &label, KEY_FONT_SIZE);
        }
        for key in self.keys.iter().filter(|key| key.pitch.note.is_sharp()) {
            draw_key(key.rect, key.active, true, "", KEY_FONT_SIZE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitch(note: Note, octave: u8) -> Pitch {
        Pitch::new(note, Octave::new(octave))
    }

    #[test]
    fn covers_every_pitch_a_playable_scale_reaches() {
        let widgets = KeyWidgets::new(LOWEST_OCTAVE, HIGHEST_OCTAVE);
        assert_eq!(widgets.keys().len(), 6 * 12);
        assert_eq!(widgets.keys()[0].pitch, pitch(Note::C, 2));
        assert!(widgets.contains(pitch(Note::B, 7)));
        assert!(!widgets.contains(pitch(Note::C, 8)));
        assert!(!widgets.contains(pitch(Note::B, 1)));
    }

    #[test]
    fn active_flags_track_by_pitch() {
        let mut widgets = KeyWidgets::new(LOWEST_OCTAVE, HIGHEST_OCTAVE);
        assert!(widgets.set_active(pitch(Note::E, 4), true));
        assert!(widgets.is_active(pitch(Note::E, 4)));
        assert!(!widgets.set_active(pitch(Note::E, 0), true));
        assert!(!widgets.is_active(pitch(Note::E, 0)));
    }

    #[test]
    fn black_keys_win_hit_tests_over_white_keys() {
        let mut widgets = KeyWidgets::new(Octave::new(4), Octave::new(4));
        widgets.layout(Rect::new(0.0, 0.0, 700.0, 100.0));

        // Seven white keys, 100px each; C# straddles the C/D boundary.
        assert_eq!(widgets.hit_test(vec2(100.0, 10.0)), Some(pitch(Note::CSharp, 4)));
        assert_eq!(widgets.hit_test(vec2(100.0, 90.0)), Some(pitch(Note::D, 4)));
        assert_eq!(widgets.hit_test(vec2(10.0, 90.0)), Some(pitch(Note::C, 4)));
        assert_eq!(widgets.hit_test(vec2(650.0, 90.0)), Some(pitch(Note::B, 4)));
        assert_eq!(widgets.hit_test(vec2(10.0, 150.0)), None);
    }
}
