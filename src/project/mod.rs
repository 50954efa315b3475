// Snapshot persistence - Pattern, tempo, sync and track state as RON or JSON

pub mod serialization;
pub mod types;

use std::path::Path;

pub use serialization::{
    apply_snapshot, deserialize_from_json, deserialize_from_ron, engine_snapshot,
    pattern_from_snapshot, pattern_to_snapshot, serialize_to_json, serialize_to_ron,
};
pub use types::{EngineSettings, FORMAT_VERSION, PatternSnapshot, SequencerSnapshot, TrackSnapshot};

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot format version {0}")]
    UnsupportedVersion(u32),
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Write a snapshot, as JSON for `.json` paths and RON otherwise
pub fn save_snapshot<P: AsRef<Path>>(
    snapshot: &SequencerSnapshot,
    path: P,
) -> Result<(), ProjectError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let text = if is_json(path) {
        serialize_to_json(snapshot)?
    } else {
        serialize_to_ron(snapshot)?
    };
    std::fs::write(path, text)?;
    tracing::debug!(path = %path.display(), "Snapshot saved");
    Ok(())
}

/// Read a snapshot written by [`save_snapshot`]
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<SequencerSnapshot, ProjectError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    if is_json(path) {
        deserialize_from_json(&text)
    } else {
        deserialize_from_ron(&text)
    }
}
