use std::collections::HashMap;

use macroquad::prelude::KeyCode;

use crate::engine::PitchSink;
use crate::keyboard::KeyWidgets;
use crate::state::{PlaybackState, StateChange, Subscription};
use crate::theory::{derive_scale_notes, Pitch};

/// Physical keys, in the order they index the derived note sequence.
pub const NOTE_KEYS: [KeyCode; 8] = [
    KeyCode::A,
    KeyCode::S,
    KeyCode::D,
    KeyCode::F,
    KeyCode::H,
    KeyCode::J,
    KeyCode::K,
    KeyCode::L,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    PointerDown(Pitch),
    PointerUp(Pitch),
    PointerLeave(Pitch),
    KeyDown { key: KeyCode, repeat: bool },
    KeyUp { key: KeyCode },
}

/// Routes pointer and key events to a [`PitchSink`], lighting the matching
/// key widgets as it goes. A pitch held by several inputs at once (two keys
/// after an octave shift, or a key and the pointer) stops only when the last
/// of them lets go.
pub struct InputDispatcher {
    bindings: HashMap<KeyCode, usize>,
    notes: Vec<Pitch>,
    widgets: KeyWidgets,
    held_keys: HashMap<KeyCode, Pitch>,
    pointer_pressed: Option<Pitch>,
    holders: HashMap<Pitch, usize>,
    subscription: Option<Subscription>,
    recomputations: usize,
}

impl InputDispatcher {
    pub fn new(state: &mut PlaybackState, widgets: KeyWidgets) -> Self {
        let bindings = NOTE_KEYS
            .iter()
            .enumerate()
            .map(|(position, key)| (*key, position))
            .collect();
        let subscription = state.subscribe();
        let mut dispatcher = Self {
            bindings,
            notes: Vec::new(),
            widgets,
            held_keys: HashMap::new(),
            pointer_pressed: None,
            holders: HashMap::new(),
            subscription: Some(subscription),
            recomputations: 0,
        };
        dispatcher.recompute(state.snapshot());
        dispatcher
    }

    pub fn notes(&self) -> &[Pitch] {
        &self.notes
    }

    pub fn widgets(&self) -> &KeyWidgets {
        &self.widgets
    }

    pub fn widgets_mut(&mut self) -> &mut KeyWidgets {
        &mut self.widgets
    }

    #[cfg(test)]
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    #[cfg(test)]
    pub fn is_bound(&self, key: KeyCode) -> bool {
        self.bindings.contains_key(&key)
    }

    /// Applies pending state notifications, one recomputation each.
    pub fn sync(&mut self) {
        let changes = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return,
        };
        for change in changes {
            self.recompute(change);
        }
    }

    pub fn dispatch<S: PitchSink + ?Sized>(&mut self, event: InputEvent, sink: &mut S) {
        self.sync();
        match event {
            InputEvent::PointerDown(pitch) => {
                if let Some(previous) = self.pointer_pressed.take() {
                    self.lift(previous, sink);
                }
                if self.press(pitch, sink) {
                    self.pointer_pressed = Some(pitch);
                }
            }
            InputEvent::PointerUp(pitch) | InputEvent::PointerLeave(pitch) => {
                if self.pointer_pressed == Some(pitch) {
                    self.pointer_pressed = None;
                    self.lift(pitch, sink);
                }
            }
            InputEvent::KeyDown { key, repeat } => {
                if repeat || self.held_keys.contains_key(&key) {
                    return;
                }
                let Some(pitch) = self.resolve(key) else {
                    return;
                };
                if self.press(pitch, sink) {
                    self.held_keys.insert(key, pitch);
                } else {
                    log::trace!("no key widget for {pitch}, ignoring {key:?}");
                }
            }
            InputEvent::KeyUp { key } => {
                // Stops what the key started, even if the scale moved since.
                if let Some(pitch) = self.held_keys.remove(&key) {
                    self.lift(pitch, sink);
                }
            }
        }
    }

    /// Lights and starts `pitch` for one more holder; false when there is no
    /// widget for it.
    fn press<S: PitchSink + ?Sized>(&mut self, pitch: Pitch, sink: &mut S) -> bool {
        if !self.widgets.set_active(pitch, true) {
            return false;
        }
        *self.holders.entry(pitch).or_insert(0) += 1;
        sink.start_pitch(pitch);
        true
    }

    fn lift<S: PitchSink + ?Sized>(&mut self, pitch: Pitch, sink: &mut S) {
        let Some(count) = self.holders.get_mut(&pitch) else {
            return;
        };
        *count -= 1;
        if *count > 0 {
            log::trace!("{pitch} still held by {count} input(s)");
            return;
        }
        self.holders.remove(&pitch);
        self.widgets.set_active(pitch, false);
        sink.stop_pitch(pitch);
    }

    /// Turns raw left-button state into pointer events for the hovered key.
    pub fn pointer_events(
        &self,
        hovered: Option<Pitch>,
        button_pressed: bool,
        button_down: bool,
        button_released: bool,
    ) -> Vec<InputEvent> {
        let mut events = Vec::new();
        if let Some(active) = self.pointer_pressed {
            if button_released {
                if hovered == Some(active) {
                    events.push(InputEvent::PointerUp(active));
                } else {
                    events.push(InputEvent::PointerLeave(active));
                }
                return events;
            }
            if button_down && hovered != Some(active) {
                events.push(InputEvent::PointerLeave(active));
            }
            return events;
        }
        if button_pressed {
            if let Some(pitch) = hovered {
                events.push(InputEvent::PointerDown(pitch));
            }
        }
        events
    }

    pub fn teardown(&mut self, state: &mut PlaybackState) {
        if let Some(subscription) = self.subscription.take() {
            state.unsubscribe(subscription.id);
        }
    }

    fn resolve(&self, key: KeyCode) -> Option<Pitch> {
        let position = *self.bindings.get(&key)?;
        self.notes.get(position).copied()
    }

    fn recompute(&mut self, change: StateChange) {
        self.notes = derive_scale_notes(change.key_note, change.scale, change.octave);
        self.recomputations += 1;
        log::debug!(
            "key bindings #{} now {}",
            self.recomputations,
            self.notes
                .iter()
                .map(|pitch| pitch.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{HIGHEST_OCTAVE, LOWEST_OCTAVE};
    use crate::theory::{Note, Octave, Scale};

    #[derive(Debug, PartialEq)]
    enum Call {
        Start(Pitch),
        Stop(Pitch),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<Call>,
    }

    impl PitchSink for RecordingSink {
        fn start_pitch(&mut self, pitch: Pitch) {
            self.calls.push(Call::Start(pitch));
        }

        fn stop_pitch(&mut self, pitch: Pitch) {
            self.calls.push(Call::Stop(pitch));
        }
    }

    fn pitch(note: Note, octave: u8) -> Pitch {
        Pitch::new(note, Octave::new(octave))
    }

    fn setup() -> (PlaybackState, InputDispatcher, RecordingSink) {
        let mut state = PlaybackState::new();
        let widgets = KeyWidgets::new(LOWEST_OCTAVE, HIGHEST_OCTAVE);
        let dispatcher = InputDispatcher::new(&mut state, widgets);
        (state, dispatcher, RecordingSink::default())
    }

    fn down(key: KeyCode) -> InputEvent {
        InputEvent::KeyDown { key, repeat: false }
    }

    #[test]
    fn keys_play_the_derived_scale_positionally() {
        let (_state, mut dispatcher, mut sink) = setup();
        dispatcher.dispatch(down(KeyCode::A), &mut sink);
        dispatcher.dispatch(down(KeyCode::L), &mut sink);
        assert_eq!(
            sink.calls,
            vec![Call::Start(pitch(Note::C, 4)), Call::Start(pitch(Note::C, 5))]
        );
        assert!(dispatcher.widgets().is_active(pitch(Note::C, 4)));

        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::A }, &mut sink);
        assert_eq!(sink.calls[2], Call::Stop(pitch(Note::C, 4)));
        assert!(!dispatcher.widgets().is_active(pitch(Note::C, 4)));
    }

    #[test]
    fn repeats_do_not_retrigger() {
        let (_state, mut dispatcher, mut sink) = setup();
        dispatcher.dispatch(down(KeyCode::S), &mut sink);
        dispatcher.dispatch(InputEvent::KeyDown { key: KeyCode::S, repeat: true }, &mut sink);
        dispatcher.dispatch(down(KeyCode::S), &mut sink);
        assert_eq!(sink.calls, vec![Call::Start(pitch(Note::D, 4))]);
    }

    #[test]
    fn stray_key_up_is_ignored() {
        let (_state, mut dispatcher, mut sink) = setup();
        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::D }, &mut sink);
        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::Z }, &mut sink);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn unbound_keys_do_nothing() {
        let (_state, mut dispatcher, mut sink) = setup();
        dispatcher.dispatch(down(KeyCode::G), &mut sink);
        assert!(sink.calls.is_empty());
        assert!(!dispatcher.is_bound(KeyCode::G));
    }

    #[test]
    fn state_change_recomputes_once_and_shifts_the_octave() {
        let (mut state, mut dispatcher, _sink) = setup();
        let before = dispatcher.recomputations();
        let first = dispatcher.notes()[0];

        state.set_octave(Octave::new(5));
        dispatcher.sync();

        assert_eq!(dispatcher.recomputations(), before + 1);
        assert_eq!(dispatcher.notes()[0].octave.value(), first.octave.value() + 1);

        dispatcher.sync();
        assert_eq!(dispatcher.recomputations(), before + 1);
    }

    #[test]
    fn notifications_apply_before_the_next_event() {
        let (mut state, mut dispatcher, mut sink) = setup();
        state.set_key_note(Note::A);
        state.set_scale(Scale::Minor);
        dispatcher.dispatch(down(KeyCode::D), &mut sink);
        assert_eq!(sink.calls, vec![Call::Start(pitch(Note::C, 5))]);
        assert_eq!(
            dispatcher.notes(),
            derive_scale_notes(Note::A, Scale::Minor, Octave::new(4)).as_slice()
        );
    }

    #[test]
    fn key_up_stops_the_pitch_its_key_started() {
        let (mut state, mut dispatcher, mut sink) = setup();
        dispatcher.dispatch(down(KeyCode::A), &mut sink);
        state.set_octave(Octave::new(5));
        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::A }, &mut sink);
        assert_eq!(
            sink.calls,
            vec![Call::Start(pitch(Note::C, 4)), Call::Stop(pitch(Note::C, 4))]
        );
    }

    #[test]
    fn two_keys_on_one_pitch_stop_only_after_both_release() {
        let (mut state, mut dispatcher, mut sink) = setup();
        let c4 = pitch(Note::C, 4);
        dispatcher.dispatch(down(KeyCode::A), &mut sink);
        state.set_octave(Octave::new(3));
        // L is now the top of the C3 scale: C4 again.
        dispatcher.dispatch(down(KeyCode::L), &mut sink);
        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::A }, &mut sink);

        assert!(!sink.calls.contains(&Call::Stop(c4)));
        assert!(dispatcher.widgets().is_active(c4));

        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::L }, &mut sink);
        assert_eq!(sink.calls.last(), Some(&Call::Stop(c4)));
        assert!(!dispatcher.widgets().is_active(c4));
    }

    #[test]
    fn pointer_and_key_share_a_held_pitch() {
        let (_state, mut dispatcher, mut sink) = setup();
        let c4 = pitch(Note::C, 4);
        dispatcher.dispatch(down(KeyCode::A), &mut sink);
        dispatcher.dispatch(InputEvent::PointerDown(c4), &mut sink);
        dispatcher.dispatch(InputEvent::PointerUp(c4), &mut sink);
        assert!(!sink.calls.contains(&Call::Stop(c4)));
        assert!(dispatcher.widgets().is_active(c4));

        dispatcher.dispatch(InputEvent::PointerDown(c4), &mut sink);
        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::A }, &mut sink);
        assert!(!sink.calls.contains(&Call::Stop(c4)));

        dispatcher.dispatch(InputEvent::PointerLeave(c4), &mut sink);
        assert_eq!(
            sink.calls.iter().filter(|call| **call == Call::Stop(c4)).count(),
            1
        );
        assert!(!dispatcher.widgets().is_active(c4));
    }

    #[test]
    fn pointer_up_without_a_press_is_ignored() {
        let (_state, mut dispatcher, mut sink) = setup();
        dispatcher.dispatch(down(KeyCode::D), &mut sink);
        dispatcher.dispatch(InputEvent::PointerUp(pitch(Note::E, 4)), &mut sink);
        assert_eq!(sink.calls, vec![Call::Start(pitch(Note::E, 4))]);
        assert!(dispatcher.widgets().is_active(pitch(Note::E, 4)));
    }

    #[test]
    fn missing_widget_means_no_action() {
        let mut state = PlaybackState::new();
        let widgets = KeyWidgets::new(Octave::new(4), Octave::new(4));
        let mut dispatcher = InputDispatcher::new(&mut state, widgets);
        let mut sink = RecordingSink::default();

        // C5 has no widget in a one-octave keyboard.
        dispatcher.dispatch(down(KeyCode::L), &mut sink);
        dispatcher.dispatch(InputEvent::KeyUp { key: KeyCode::L }, &mut sink);
        dispatcher.dispatch(InputEvent::PointerDown(pitch(Note::C, 5)), &mut sink);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn pointer_press_release_and_leave() {
        let (_state, mut dispatcher, mut sink) = setup();
        let e4 = pitch(Note::E, 4);
        let f4 = pitch(Note::F, 4);

        let events = dispatcher.pointer_events(Some(e4), true, true, false);
        assert_eq!(events, vec![InputEvent::PointerDown(e4)]);
        for event in events {
            dispatcher.dispatch(event, &mut sink);
        }
        assert!(dispatcher.widgets().is_active(e4));

        // Held in place: nothing new.
        assert!(dispatcher.pointer_events(Some(e4), false, true, false).is_empty());

        // Dragged off the key while pressed.
        let events = dispatcher.pointer_events(Some(f4), false, true, false);
        assert_eq!(events, vec![InputEvent::PointerLeave(e4)]);
        for event in events {
            dispatcher.dispatch(event, &mut sink);
        }
        assert_eq!(sink.calls, vec![Call::Start(e4), Call::Stop(e4)]);
        assert!(!dispatcher.widgets().is_active(e4));

        // Releasing afterwards does not stop anything again.
        assert!(dispatcher.pointer_events(Some(f4), false, false, true).is_empty());
    }

    #[test]
    fn pointer_release_over_the_key_stops_it() {
        let (_state, mut dispatcher, mut sink) = setup();
        let g4 = pitch(Note::G, 4);
        dispatcher.dispatch(InputEvent::PointerDown(g4), &mut sink);
        let events = dispatcher.pointer_events(Some(g4), false, false, true);
        assert_eq!(events, vec![InputEvent::PointerUp(g4)]);
        dispatcher.dispatch(events[0], &mut sink);
        assert_eq!(sink.calls, vec![Call::Start(g4), Call::Stop(g4)]);
    }

    #[test]
    fn leave_without_press_is_ignored() {
        let (_state, mut dispatcher, mut sink) = setup();
        dispatcher.dispatch(InputEvent::PointerLeave(pitch(Note::A, 4)), &mut sink);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn teardown_unsubscribes() {
        let (mut state, mut dispatcher, _sink) = setup();
        assert_eq!(state.subscriber_count(), 1);
        dispatcher.teardown(&mut state);
        assert_eq!(state.subscriber_count(), 0);

        let before = dispatcher.recomputations();
        state.set_octave(Octave::new(3));
        dispatcher.sync();
        assert_eq!(dispatcher.recomputations(), before);
    }
}
