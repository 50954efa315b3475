// Entry - One step of musical content in a pattern cell
// Value object: copied, never shared between cells

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest octave an entry may carry
pub const MAX_OCTAVE: u8 = 8;

/// Highest user-facing program number (1-based, 0 = unset)
pub const MAX_PROGRAM: u8 = 32;

/// Note names indexed by pitch class offset
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The twelve pitch classes of the chromatic scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitone offset from C (0-11)
    pub fn offset(self) -> u8 {
        self as u8
    }

    /// Pitch class for a semitone offset, wrapping above 11
    pub fn from_offset(offset: u8) -> Self {
        Self::ALL[(offset % 12) as usize]
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.offset() as usize]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Effect marker attached to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Silence whatever is sounding on the track
    NoteOff,
}

/// Musical content of a single pattern cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    /// Pitch class, None = empty cell
    pub note: Option<PitchClass>,
    /// Octave (0-8)
    pub octave: u8,
    /// Program select (0 = unset, 1-32)
    pub program: u8,
    /// Note volume (0-127)
    pub volume: u8,
    pub effect: Option<Effect>,
}

impl Entry {
    /// Creates a note entry at full volume with no program change
    pub fn new(note: PitchClass, octave: u8) -> Self {
        Self {
            note: Some(note),
            octave: octave.min(MAX_OCTAVE),
            ..Self::default()
        }
    }

    /// Creates a note-off marker
    pub fn note_off() -> Self {
        Self {
            effect: Some(Effect::NoteOff),
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume.min(127);
        self
    }

    pub fn with_program(mut self, program: u8) -> Self {
        self.program = program.min(MAX_PROGRAM);
        self
    }

    /// An entry without a note produces no sound
    pub fn is_empty(&self) -> bool {
        self.note.is_none()
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self.effect, Some(Effect::NoteOff))
    }

    /// MIDI note number, or None when empty or outside 0-127
    ///
    /// Fields are public and may come from deserialized data, so the octave
    /// is not trusted to be within range here.
    pub fn midi_note(&self) -> Option<u8> {
        let pitch = self.note?;
        let number = self.octave as u16 * 12 + pitch.offset() as u16;
        u8::try_from(number).ok().filter(|n| *n <= 127)
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            note: None,
            octave: 4,
            program: 0,
            volume: 127,
            effect: None,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_note_off() {
            return f.write_str("OFF");
        }
        match self.note {
            Some(pitch) => write!(f, "{}{}", pitch, self.octave),
            None => f.write_str("---"),
        }
    }
}
