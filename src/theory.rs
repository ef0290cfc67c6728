use std::fmt;

const REFERENCE_FREQ: f32 = 440.0;
const REFERENCE_OCTAVE: i32 = 4;

/// Pitch class, in the chromatic order the keyboard counts from (A first).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Note {
    A,
    ASharp,
    B,
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
}

impl Note {
    pub const ALL: [Note; 12] = [
        Note::A,
        Note::ASharp,
        Note::B,
        Note::C,
        Note::CSharp,
        Note::D,
        Note::DSharp,
        Note::E,
        Note::F,
        Note::FSharp,
        Note::G,
        Note::GSharp,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Octave numbers roll over at this note.
    pub const ROOT: Note = Note::C;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::COUNT]
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(self) -> Self {
        Self::from_index(self.index() + Self::COUNT - 1)
    }

    pub fn is_sharp(self) -> bool {
        matches!(
            self,
            Note::ASharp | Note::CSharp | Note::DSharp | Note::FSharp | Note::GSharp
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Note::A => "A",
            Note::ASharp => "A#",
            Note::B => "B",
            Note::C => "C",
            Note::CSharp => "C#",
            Note::D => "D",
            Note::DSharp => "D#",
            Note::E => "E",
            Note::F => "F",
            Note::FSharp => "F#",
            Note::G => "G",
            Note::GSharp => "G#",
        }
    }

    fn semitones_from_root(self) -> i32 {
        let distance = self.index() as i32 - Self::ROOT.index() as i32;
        distance.rem_euclid(Self::COUNT as i32)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Octave number; pitches are named across 0-8, the controls play 2-6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Octave(u8);

impl Octave {
    pub const PLAYABLE_MIN: Octave = Octave(2);
    pub const PLAYABLE_MAX: Octave = Octave(6);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Steps by `delta`, or `None` when the result leaves `[min, max]`.
    pub fn checked_step(self, delta: i8, min: Octave, max: Octave) -> Option<Octave> {
        let stepped = self.0 as i16 + delta as i16;
        if stepped < min.0 as i16 || stepped > max.0 as i16 {
            None
        } else {
            Some(Octave(stepped as u8))
        }
    }

    fn raised(self) -> Octave {
        Octave(self.0.saturating_add(1))
    }
}

impl fmt::Display for Octave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    pub const ALL: [Scale; 2] = [Scale::Major, Scale::Minor];

    /// Semitone offsets from the key note, closing on the octave.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11, 12],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10, 12],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scale::Major => "Major",
            Scale::Minor => "Minor",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub note: Note,
    pub octave: Octave,
}

impl Pitch {
    pub const fn new(note: Note, octave: Octave) -> Self {
        Self { note, octave }
    }

    pub fn semitones_from_a4(&self) -> i32 {
        let a4 = REFERENCE_OCTAVE * 12 + Note::A.semitones_from_root();
        self.octave.value() as i32 * 12 + self.note.semitones_from_root() - a4
    }

    /// Equal-tempered frequency with A4 at 440 Hz.
    pub fn frequency(&self) -> f32 {
        REFERENCE_FREQ * 2.0f32.powf(self.semitones_from_a4() as f32 / 12.0)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.note, self.octave)
    }
}

/// Lays the scale out from `key_note` in `base_octave`, one pitch per interval.
///
/// Octave numbers follow the usual convention of rolling over at C rather
/// than at the key note: the running octave rises whenever the sequence lands
/// on C or steps over it.
pub fn derive_scale_notes(key_note: Note, scale: Scale, base_octave: Octave) -> Vec<Pitch> {
    let key_index = key_note.index();
    let root_index = Note::ROOT.index();
    let mut octave = base_octave;
    let mut previous_index = key_index;

    scale
        .intervals()
        .iter()
        .enumerate()
        .map(|(position, offset)| {
            let note_index = (key_index + *offset as usize) % Note::COUNT;
            let crossed_root = previous_index < root_index && note_index > root_index;
            if position != 0 && (note_index == root_index || crossed_root) {
                octave = octave.raised();
            }
            previous_index = note_index;
            Pitch::new(Note::from_index(note_index), octave)
        })
        .collect()
}
