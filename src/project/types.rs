// Types for snapshot persistence
// Every field defaults so partial or older snapshots still load

use serde::{Deserialize, Serialize};

use crate::sequencer::clock::DEFAULT_BPM;
use crate::sequencer::entry::Entry;
use crate::sequencer::pattern::{DEFAULT_ROWS, TRACK_COUNT};
use crate::sequencer::transport::SyncSettings;

/// Snapshot format written by this build
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to restore a sequencer: grid, clock settings, tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSnapshot {
    pub format_version: u32,
    pub pattern: PatternSnapshot,
    pub engine: EngineSettings,
    pub tracks: Vec<TrackSnapshot>,
}

impl Default for SequencerSnapshot {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            pattern: PatternSnapshot::default(),
            engine: EngineSettings::default(),
            tracks: vec![TrackSnapshot::default(); TRACK_COUNT],
        }
    }
}

/// Serializable pattern grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSnapshot {
    pub name: String,
    pub rows: usize,
    pub tracks: usize,
    /// One inner vector per row, one entry per track
    pub entries: Vec<Vec<Entry>>,
}

impl Default for PatternSnapshot {
    fn default() -> Self {
        Self {
            name: "Pattern 1".to_string(),
            rows: DEFAULT_ROWS,
            tracks: TRACK_COUNT,
            entries: Vec::new(),
        }
    }
}

/// Tempo, sync flags and routing default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub bpm: f64,
    pub sync: SyncSettings,
    pub default_device: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            sync: SyncSettings::default(),
            default_device: None,
        }
    }
}

/// Serializable track state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSnapshot {
    pub muted: bool,
    pub program: u8,
    pub volume: u8,
    pub device: Option<String>,
}

impl Default for TrackSnapshot {
    fn default() -> Self {
        Self {
            muted: false,
            program: 0,
            volume: 127,
            device: None,
        }
    }
}
