// MIDI output pool - midir connections behind the OutputSink seam

use crate::config::DeviceConfig;
use crate::midi::CLIENT_NAME;
use crate::midi::device::find_port_index;
use crate::midi::sink::{MidiError, OutputId, OutputSink, ResolvedDevice, StaticResolver};
use midir::{MidiOutput as MidirOutput, MidiOutputConnection};
use std::collections::HashMap;

/// Open output connections, keyed by port name
#[derive(Default)]
pub struct MidiOutputPool {
    connections: HashMap<OutputId, MidiOutputConnection>,
}

impl MidiOutputPool {
    /// Connect every configured device plus the first port as system default
    ///
    /// Devices whose port is missing are skipped with a warning so the
    /// sequencer can still run on whatever is plugged in.
    pub fn open(devices: &[DeviceConfig]) -> Result<(Self, StaticResolver), MidiError> {
        let probe = MidirOutput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        let names: Vec<String> = probe
            .ports()
            .iter()
            .filter_map(|p| probe.port_name(p).ok())
            .collect();

        let mut pool = Self::default();
        let mut resolver = StaticResolver::new();

        for device in devices {
            let Some(index) = find_port_index(&names, &device.port) else {
                tracing::warn!(
                    device = %device.id,
                    port = %device.port,
                    "Configured MIDI device not found"
                );
                continue;
            };
            match pool.connect(&names[index]) {
                Ok(output) => {
                    tracing::info!(
                        device = %device.id,
                        port = %output,
                        channel = device.channel,
                        "MIDI device ready"
                    );
                    resolver.insert(
                        device.id.clone(),
                        ResolvedDevice::new(output, device.channel),
                    );
                }
                Err(e) => tracing::warn!(device = %device.id, "{}", e),
            }
        }

        if let Some(first) = names.first() {
            match pool.connect(first) {
                Ok(output) => resolver.set_system_default(Some(ResolvedDevice::new(output, 0))),
                Err(e) => tracing::warn!("Default MIDI output unavailable: {}", e),
            }
        } else {
            tracing::warn!("No MIDI output port detected, notes will be dropped");
        }

        Ok((pool, resolver))
    }

    /// Connect to the port with exactly this name, reusing an open connection
    pub fn connect(&mut self, port_name: &str) -> Result<OutputId, MidiError> {
        let id = OutputId::new(port_name);
        if self.connections.contains_key(&id) {
            return Ok(id);
        }

        let midi_out = MidirOutput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).is_ok_and(|name| name == port_name))
            .ok_or_else(|| MidiError::PortNotFound(port_name.to_string()))?;
        let connection = midi_out
            .connect(&port, "live-sequencer-out")
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        self.connections.insert(id.clone(), connection);
        Ok(id)
    }
}

impl OutputSink for MidiOutputPool {
    fn send(&mut self, output: &OutputId, bytes: &[u8]) -> Result<(), MidiError> {
        let connection = self
            .connections
            .get_mut(output)
            .ok_or_else(|| MidiError::UnknownOutput(output.clone()))?;
        connection.send(bytes).map_err(|e| MidiError::Send {
            output: output.clone(),
            reason: e.to_string(),
        })
    }
}
