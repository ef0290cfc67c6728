use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::theory::{Note, Octave, Scale};

/// The values a subscriber sees after a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange {
    pub key_note: Note,
    pub scale: Scale,
    pub octave: Octave,
}

pub type SubscriptionId = usize;

pub struct Subscription {
    pub id: SubscriptionId,
    receiver: Receiver<StateChange>,
}

impl Subscription {
    /// Drains pending notifications, returning them oldest first.
    pub fn drain(&self) -> Vec<StateChange> {
        let mut changes = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(change) => changes.push(change),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changes
    }
}

/// Key note, scale and octave the keyboard plays in.
///
/// Setters store without validation; the control layer is responsible for
/// keeping the octave in its playable range. Each setter publishes exactly one
/// [`StateChange`] to every live subscriber before returning.
pub struct PlaybackState {
    key_note: Note,
    scale: Scale,
    octave: Octave,
    subscribers: Vec<(SubscriptionId, Sender<StateChange>)>,
    next_id: SubscriptionId,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            key_note: Note::C,
            scale: Scale::Major,
            octave: Octave::new(4),
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn key_note(&self) -> Note {
        self.key_note
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn octave(&self) -> Octave {
        self.octave
    }

    pub fn snapshot(&self) -> StateChange {
        StateChange {
            key_note: self.key_note,
            scale: self.scale,
            octave: self.octave,
        }
    }

    pub fn set_key_note(&mut self, key_note: Note) {
        self.key_note = key_note;
        self.publish();
    }

    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;
        self.publish();
    }

    pub fn set_octave(&mut self, octave: Octave) {
        self.octave = octave;
        self.publish();
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn publish(&mut self) {
        let change = self.snapshot();
        log::debug!(
            "playback state: key {} scale {} octave {}",
            change.key_note,
            change.scale,
            change.octave
        );
        // A failed send means the receiving side was dropped without unsubscribing.
        self.subscribers.retain(|(_, tx)| tx.send(change).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_c_major_octave_four() {
        let state = PlaybackState::new();
        assert_eq!(state.key_note(), Note::C);
        assert_eq!(state.scale(), Scale::Major);
        assert_eq!(state.octave(), Octave::new(4));
    }

    #[test]
    fn every_setter_notifies_each_subscriber_once() {
        let mut state = PlaybackState::new();
        let first = state.subscribe();
        let second = state.subscribe();

        state.set_octave(Octave::new(5));
        state.set_scale(Scale::Minor);
        state.set_key_note(Note::A);

        let seen = first.drain();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].octave, Octave::new(5));
        assert_eq!(seen[1].scale, Scale::Minor);
        assert_eq!(
            seen[2],
            StateChange {
                key_note: Note::A,
                scale: Scale::Minor,
                octave: Octave::new(5),
            }
        );
        assert_eq!(second.drain().len(), 3);
        assert!(first.drain().is_empty());
    }

    #[test]
    fn setters_do_not_clamp() {
        let mut state = PlaybackState::new();
        state.set_octave(Octave::new(8));
        assert_eq!(state.octave(), Octave::new(8));
    }

    #[test]
    fn unsubscribed_and_dropped_receivers_stop_receiving() {
        let mut state = PlaybackState::new();
        let kept = state.subscribe();
        let removed = state.subscribe();
        let dropped = state.subscribe();
        assert_eq!(state.subscriber_count(), 3);

        state.unsubscribe(removed.id);
        drop(dropped);
        state.set_scale(Scale::Minor);

        assert_eq!(state.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
        assert!(removed.drain().is_empty());
    }
}
