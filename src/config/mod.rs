// Configuration - Tempo, device table, sync flags and log filter from a RON file

use crate::midi::sink::DeviceResolver;
use crate::sequencer::clock::DEFAULT_BPM;
use crate::sequencer::engine::SequencerEngine;
use crate::sequencer::pattern::DEFAULT_ROWS;
use crate::sequencer::timer::Timer;
use crate::sequencer::transport::SyncSettings;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "live-sequencer";
const CONFIG_FILE: &str = "config.ron";

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] ron::Error),

    #[error("No configuration directory on this platform")]
    NoConfigDir,
}

/// A logical device id bound to a MIDI output port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Id referenced by track bindings
    pub id: String,
    /// Case-insensitive substring of the port name
    pub port: String,
    /// MIDI channel (0-15)
    #[serde(default)]
    pub channel: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub bpm: f64,
    pub rows: usize,
    /// Device id used by tracks without a binding
    pub default_device: Option<String>,
    pub devices: Vec<DeviceConfig>,
    /// Input port to listen on for clock and transport, first port if unset
    pub input_port: Option<String>,
    pub sync: SyncSettings,
    /// tracing EnvFilter directives, RUST_LOG takes precedence
    pub log_filter: String,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            rows: DEFAULT_ROWS,
            default_device: None,
            devices: Vec::new(),
            input_port: None,
            sync: SyncSettings::default(),
            log_filter: "live_sequencer=info".to_string(),
        }
    }
}

impl SequencerConfig {
    /// `<config dir>/live-sequencer/config.ron`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from `path`; a missing file yields the default config
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_ron_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Self::default_path()?)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Push tempo, sync flags and the default device into an engine
    pub fn apply_to<T: Timer>(&self, engine: &mut SequencerEngine<T>) {
        engine.set_bpm(self.bpm);
        engine.set_sync_settings(self.sync);
        engine.set_default_device(self.default_device.clone());
    }

    /// Warn about bindings the device table cannot satisfy
    pub fn check_devices(&self, resolver: &dyn DeviceResolver) -> Vec<String> {
        let missing: Vec<String> = self
            .default_device
            .iter()
            .filter(|id| resolver.resolve(id).is_none())
            .cloned()
            .collect();
        for id in &missing {
            tracing::warn!(device = %id, "Default device is not connected");
        }
        missing
    }
}
