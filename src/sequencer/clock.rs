// Clock - Tempo math, clock states and the single tick slot
// Handles conversion between BPM and row duration

use crate::sequencer::timer::{TickHandle, Timer};
use std::fmt;
use std::time::Duration;

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Rows per beat under the internal clock (rows are sixteenth notes)
pub const ROWS_PER_BEAT: f64 = 4.0;

/// MIDI clock resolution (pulses per quarter note)
pub const PPQN: u32 = 24;

/// Clock pulses per row when slaved to an external clock
///
/// The external clock advances two rows per beat, not four.
pub const PULSES_PER_ROW: u32 = PPQN / 2;

/// Tempo in BPM, always within [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo, clamping out-of-range (and non-finite) values
    pub fn new(bpm: f64) -> Self {
        let bpm = if bpm.is_nan() { DEFAULT_BPM } else { bpm };
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in milliseconds
    pub fn ms_per_beat(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Duration of one row in milliseconds: (60000 / BPM) / 4
    pub fn ms_per_row(&self) -> f64 {
        self.ms_per_beat() / ROWS_PER_BEAT
    }

    pub fn row_duration(&self) -> Duration {
        Duration::from_secs_f64(self.ms_per_row() / 1000.0)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Which source is advancing the row cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    /// Advanced by the engine's own drift-compensated timer
    PlayingInternal,
    /// Advanced only by incoming clock pulses
    PlayingExternalClockSlave,
}

impl ClockState {
    pub fn is_playing(&self) -> bool {
        !matches!(self, ClockState::Stopped)
    }
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ClockState::Stopped => "stopped",
            ClockState::PlayingInternal => "playing (internal clock)",
            ClockState::PlayingExternalClockSlave => "playing (external clock)",
        };
        f.write_str(label)
    }
}

/// Owner of the one pending tick
///
/// Arming always cancels the previous occupant, so two live ticks cannot
/// exist. A fired handle is only honoured if it is still the occupant.
#[derive(Debug, Default)]
pub struct TickSlot {
    current: Option<TickHandle>,
}

impl TickSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending tick and schedule a new one after `delay`
    pub fn arm<T: Timer>(&mut self, timer: &mut T, delay: Duration) -> TickHandle {
        self.disarm(timer);
        let handle = timer.schedule(delay);
        self.current = Some(handle);
        handle
    }

    /// Cancel the pending tick; returns true if one was pending
    pub fn disarm<T: Timer>(&mut self, timer: &mut T) -> bool {
        match self.current.take() {
            Some(handle) => {
                timer.cancel(handle);
                true
            }
            None => false,
        }
    }

    /// Claim a fired handle: empties the slot if `handle` is the occupant
    pub fn claim(&mut self, handle: TickHandle) -> bool {
        if self.current == Some(handle) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<TickHandle> {
        self.current
    }
}
