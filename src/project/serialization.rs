// Serialization utilities for snapshot persistence

use crate::project::ProjectError;
use crate::project::types::*;
use crate::sequencer::engine::SequencerEngine;
use crate::sequencer::pattern::{Pattern, TRACK_COUNT};
use crate::sequencer::timer::Timer;
use crate::sequencer::track::TrackState;
use ron::ser::PrettyConfig;

/// Serialize a snapshot to RON format
pub fn serialize_to_ron(snapshot: &SequencerSnapshot) -> Result<String, ProjectError> {
    Ok(ron::ser::to_string_pretty(snapshot, PrettyConfig::default())?)
}

/// Deserialize a snapshot from RON format
pub fn deserialize_from_ron(ron_data: &str) -> Result<SequencerSnapshot, ProjectError> {
    let snapshot: SequencerSnapshot = ron::from_str(ron_data)?;
    check_version(snapshot)
}

/// Serialize a snapshot to JSON format
pub fn serialize_to_json(snapshot: &SequencerSnapshot) -> Result<String, ProjectError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Deserialize a snapshot from JSON format
pub fn deserialize_from_json(json_data: &str) -> Result<SequencerSnapshot, ProjectError> {
    let snapshot: SequencerSnapshot = serde_json::from_str(json_data)?;
    check_version(snapshot)
}

fn check_version(snapshot: SequencerSnapshot) -> Result<SequencerSnapshot, ProjectError> {
    if snapshot.format_version > FORMAT_VERSION {
        return Err(ProjectError::UnsupportedVersion(snapshot.format_version));
    }
    Ok(snapshot)
}

/// Convert a Pattern to its serializable grid
pub fn pattern_to_snapshot(pattern: &Pattern) -> PatternSnapshot {
    PatternSnapshot {
        name: pattern.name().to_string(),
        rows: pattern.rows(),
        tracks: pattern.tracks(),
        entries: (0..pattern.rows())
            .map(|row| pattern.row(row).to_vec())
            .collect(),
    }
}

/// Convert a serializable grid back to a Pattern
///
/// Short or missing rows are padded with empty entries, extra rows and
/// tracks beyond the grid are dropped.
pub fn pattern_from_snapshot(snapshot: &PatternSnapshot) -> Pattern {
    let mut pattern = Pattern::new(snapshot.name.clone(), snapshot.rows);
    for (row, entries) in snapshot.entries.iter().enumerate().take(pattern.rows()) {
        for (track, entry) in entries.iter().enumerate().take(TRACK_COUNT) {
            pattern.set(row, track, *entry);
        }
    }
    pattern
}

impl From<&TrackState> for TrackSnapshot {
    fn from(state: &TrackState) -> Self {
        Self {
            muted: state.muted,
            program: state.program,
            volume: state.volume,
            device: state.device.clone(),
        }
    }
}

impl From<&TrackSnapshot> for TrackState {
    fn from(snapshot: &TrackSnapshot) -> Self {
        Self {
            muted: snapshot.muted,
            program: snapshot.program,
            volume: snapshot.volume,
            device: snapshot.device.clone(),
        }
    }
}

/// Capture an engine's pattern, settings and tracks
pub fn engine_snapshot<T: Timer>(engine: &SequencerEngine<T>) -> SequencerSnapshot {
    SequencerSnapshot {
        format_version: FORMAT_VERSION,
        pattern: pattern_to_snapshot(engine.pattern()),
        engine: EngineSettings {
            bpm: engine.bpm(),
            sync: *engine.sync(),
            default_device: engine.default_device().map(str::to_string),
        },
        tracks: engine.tracks().iter().map(TrackSnapshot::from).collect(),
    }
}

/// Restore a snapshot into an engine
///
/// Tracks missing from the snapshot keep their current state.
pub fn apply_snapshot<T: Timer>(engine: &mut SequencerEngine<T>, snapshot: &SequencerSnapshot) {
    engine.load_pattern(pattern_from_snapshot(&snapshot.pattern));
    engine.set_bpm(snapshot.engine.bpm);
    engine.set_sync_settings(snapshot.engine.sync);
    engine.set_default_device(snapshot.engine.default_device.clone());
    for (track, state) in snapshot.tracks.iter().enumerate().take(TRACK_COUNT) {
        engine.replace_track(track, TrackState::from(state));
    }
}
