// Command types - Requests sent to the engine thread (UI/CLI and MIDI input)

use crate::midi::event::MidiMessage;
use crate::sequencer::entry::Entry;
use crate::sequencer::pattern::Pattern;
use crate::sequencer::transport::SyncSettings;

#[derive(Debug, Clone)]
pub enum Command {
    /// Incoming clock or transport message
    Midi(MidiMessage),
    Start,
    Stop,
    Continue,
    TogglePlay,
    SetBpm(f64),
    SetEntry {
        row: usize,
        track: usize,
        entry: Entry,
    },
    ClearPattern,
    LoadPattern(Box<Pattern>),
    SetMute {
        track: usize,
        muted: bool,
    },
    ToggleMute(usize),
    ToggleSolo(usize),
    SetTrackVolume {
        track: usize,
        volume: u8,
    },
    SetTrackProgram {
        track: usize,
        program: u8,
    },
    SetTrackDevice {
        track: usize,
        device: Option<String>,
    },
    SetDefaultDevice(Option<String>),
    SetSync(SyncSettings),
    Quit,
}
