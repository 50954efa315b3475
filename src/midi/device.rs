// MIDI devices - Port discovery for inputs and outputs

use crate::midi::CLIENT_NAME;
use midir::{MidiInput as MidirInput, MidiOutput as MidirOutput};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
    /// The first port is treated as the default
    pub is_default: bool,
}

fn port_infos(names: Vec<String>) -> Vec<MidiPortInfo> {
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| MidiPortInfo {
            index,
            name,
            is_default: index == 0,
        })
        .collect()
}

/// Index of the first port whose name contains `pattern`, ignoring case
pub fn find_port_index(names: &[String], pattern: &str) -> Option<usize> {
    let pattern = pattern.to_lowercase();
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&pattern))
}

pub struct MidiDeviceManager;

impl MidiDeviceManager {
    pub fn new() -> Self {
        Self
    }

    /// Names of all output ports, in system order
    pub fn output_port_names(&self) -> Vec<String> {
        match MidirOutput::new(CLIENT_NAME) {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(e) => {
                tracing::warn!("Cannot scan MIDI outputs: {}", e);
                Vec::new()
            }
        }
    }

    /// Names of all input ports, in system order
    pub fn input_port_names(&self) -> Vec<String> {
        match MidirInput::new(CLIENT_NAME) {
            Ok(midi_in) => midi_in
                .ports()
                .iter()
                .filter_map(|p| midi_in.port_name(p).ok())
                .collect(),
            Err(e) => {
                tracing::warn!("Cannot scan MIDI inputs: {}", e);
                Vec::new()
            }
        }
    }

    pub fn list_output_ports(&self) -> Vec<MidiPortInfo> {
        port_infos(self.output_port_names())
    }

    pub fn list_input_ports(&self) -> Vec<MidiPortInfo> {
        port_infos(self.input_port_names())
    }
}

impl Default for MidiDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
