use std::collections::HashMap;

use macroquad::prelude::*;

use crate::state::PlaybackState;
use crate::theory::Octave;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlAction {
    OctaveDown,
    OctaveUp,
    ScalePrev,
    ScaleNext,
    KeyNotePrev,
    KeyNoteNext,
}

impl ControlAction {
    pub const ALL: [ControlAction; 6] = [
        ControlAction::KeyNotePrev,
        ControlAction::KeyNoteNext,
        ControlAction::ScalePrev,
        ControlAction::ScaleNext,
        ControlAction::OctaveDown,
        ControlAction::OctaveUp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ControlAction::OctaveDown => "OCT -",
            ControlAction::OctaveUp => "OCT +",
            ControlAction::ScalePrev => "SCALE -",
            ControlAction::ScaleNext => "SCALE +",
            ControlAction::KeyNotePrev => "KEY -",
            ControlAction::KeyNoteNext => "KEY +",
        }
    }
}

/// The control layer in front of [`PlaybackState`]: steps values and keeps
/// the octave inside its playable range before anything reaches the store.
pub struct PlaybackControls {
    bindings: HashMap<KeyCode, ControlAction>,
    display: String,
}

impl PlaybackControls {
    pub fn new(state: &PlaybackState) -> Self {
        let bindings = HashMap::from([
            (KeyCode::U, ControlAction::OctaveDown),
            (KeyCode::I, ControlAction::OctaveUp),
            (KeyCode::O, ControlAction::ScalePrev),
            (KeyCode::P, ControlAction::ScaleNext),
            (KeyCode::N, ControlAction::KeyNotePrev),
            (KeyCode::M, ControlAction::KeyNoteNext),
        ]);
        let mut controls = Self {
            bindings,
            display: String::new(),
        };
        controls.render(state);
        controls
    }

    pub fn action_for(&self, key: KeyCode) -> Option<ControlAction> {
        self.bindings.get(&key).copied()
    }

    pub fn binding_for(&self, action: ControlAction) -> Option<KeyCode> {
        self.bindings
            .iter()
            .find(|(_, bound)| **bound == action)
            .map(|(key, _)| *key)
    }

    /// Applies `action`; returns false when it was refused at a bound.
    pub fn apply(&self, action: ControlAction, state: &mut PlaybackState) -> bool {
        match action {
            ControlAction::OctaveDown => step_octave(state, -1),
            ControlAction::OctaveUp => step_octave(state, 1),
            ControlAction::ScalePrev => {
                state.set_scale(state.scale().prev());
                true
            }
            ControlAction::ScaleNext => {
                state.set_scale(state.scale().next());
                true
            }
            ControlAction::KeyNotePrev => {
                state.set_key_note(state.key_note().prev());
                true
            }
            ControlAction::KeyNoteNext => {
                state.set_key_note(state.key_note().next());
                true
            }
        }
    }

    pub fn render(&mut self, state: &PlaybackState) {
        self.display = format!(
            "Key: {}  Scale: {}  Octave: {}",
            state.key_note(),
            state.scale(),
            state.octave()
        );
    }

    pub fn display(&self) -> &str {
        &self.display
    }
}

fn step_octave(state: &mut PlaybackState, delta: i8) -> bool {
    match state
        .octave()
        .checked_step(delta, Octave::PLAYABLE_MIN, Octave::PLAYABLE_MAX)
    {
        Some(octave) => {
            state.set_octave(octave);
            true
        }
        None => {
            log::debug!("octave {} is at its bound, ignoring step", state.octave());
            false
        }
    }
}

pub struct ControlButton {
    pub rect: Rect,
    pub action: ControlAction,
}

pub fn layout_buttons(area: Rect) -> Vec<ControlButton> {
    let count = ControlAction::ALL.len() as f32;
    let gap = 10.0;
    let width = ((area.w - gap * (count - 1.0)) / count).min(110.0);
    ControlAction::ALL
        .iter()
        .enumerate()
        .map(|(index, action)| ControlButton {
            rect: Rect::new(area.x + index as f32 * (width + gap), area.y, width, area.h),
            action: *action,
        })
        .collect()
}

pub fn hit_button(buttons: &[ControlButton], point: Vec2) -> Option<ControlAction> {
    buttons
        .iter()
        .find(|button| button.rect.contains(point))
        .map(|button| button.action)
}
