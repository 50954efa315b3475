// Sequencer module - Pattern model, clock and row dispatch
// The engine owns everything here and is driven by a host loop

pub mod clock;
pub mod dispatcher;
pub mod engine;
pub mod entry;
pub mod pattern;
pub mod timer;
pub mod track;
pub mod transport;

pub use clock::{ClockState, PULSES_PER_ROW, Tempo, TickSlot};
pub use dispatcher::{ActiveNote, DispatchReport, RowDispatcher};
pub use engine::SequencerEngine;
pub use entry::{Effect, Entry, PitchClass};
pub use pattern::{Pattern, TRACK_COUNT};
pub use timer::{ManualTimer, SystemTimer, TickHandle, Timer};
pub use track::{TrackBank, TrackState};
pub use transport::{SongPositionInterval, SyncSettings, TransportOrigin};
