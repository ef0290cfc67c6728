use macroquad::input::utils::{register_input_subscriber, repeat_all_miniquad_input};
use macroquad::miniquad::{EventHandler, KeyCode, KeyMods};

/// Raw key transitions for one frame. macroquad's polled key state hides
/// auto-repeat, so the frame's miniquad events are replayed here instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Down { key: KeyCode, repeat: bool },
    Up { key: KeyCode },
}

pub struct KeyEventQueue {
    subscriber: usize,
    events: Vec<KeyEvent>,
}

impl KeyEventQueue {
    pub fn new() -> Self {
        Self {
            subscriber: register_input_subscriber(),
            events: Vec::new(),
        }
    }

    pub fn poll(&mut self) -> Vec<KeyEvent> {
        self.events.clear();
        let subscriber = self.subscriber;
        repeat_all_miniquad_input(self, subscriber);
        std::mem::take(&mut self.events)
    }
}

impl EventHandler for KeyEventQueue {
    fn update(&mut self) {}

    fn draw(&mut self) {}

    fn key_down_event(&mut self, keycode: KeyCode, _keymods: KeyMods, repeat: bool) {
        self.events.push(KeyEvent::Down {
            key: keycode,
            repeat,
        });
    }

    fn key_up_event(&mut self, keycode: KeyCode, _keymods: KeyMods) {
        self.events.push(KeyEvent::Up { key: keycode });
    }
}
