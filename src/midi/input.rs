// MIDI Input - Receives clock and transport messages from an external master

use crate::messaging::channels::CommandProducer;
use crate::messaging::command::Command;
use crate::midi::CLIENT_NAME;
use crate::midi::device::find_port_index;
use crate::midi::event::MidiMessage;
use crate::midi::sink::MidiError;
use midir::{Ignore, MidiInput as MidirInput, MidiInputConnection};

pub struct MidiInput {
    port_name: Option<String>,
    // Dropping the connection closes the port
    _connection: Option<MidiInputConnection<()>>,
}

impl MidiInput {
    /// Listen on the first port matching `port_pattern`, or the first port
    ///
    /// Without any input port the sequencer keeps running on its own clock.
    pub fn new(
        mut command_tx: CommandProducer,
        port_pattern: Option<&str>,
    ) -> Result<Self, MidiError> {
        let mut midi_in =
            MidirInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        // Timing clock must come through
        midi_in.ignore(Ignore::SysexAndActiveSense);

        let ports = midi_in.ports();
        if ports.is_empty() {
            tracing::info!("No MIDI input port detected, external sync unavailable");
            return Ok(Self {
                port_name: None,
                _connection: None,
            });
        }

        let names: Vec<String> = ports
            .iter()
            .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
            .collect();

        let index = match port_pattern {
            Some(pattern) => find_port_index(&names, pattern)
                .ok_or_else(|| MidiError::PortNotFound(pattern.to_string()))?,
            None => 0,
        };
        let port_name = names[index].clone();

        let connection = midi_in
            .connect(
                &ports[index],
                "live-sequencer-in",
                move |_timestamp, bytes, _| {
                    // Runs on the midir thread
                    let Some(message) = MidiMessage::from_bytes(bytes) else {
                        return;
                    };
                    if !message.is_transport() {
                        return;
                    }
                    let pushed = ringbuf::traits::Producer::try_push(
                        &mut command_tx,
                        Command::Midi(message),
                    );
                    if pushed.is_err() {
                        tracing::warn!("MIDI input buffer full, {:?} dropped", message);
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        tracing::info!(port = %port_name, "Listening for MIDI sync");

        Ok(Self {
            port_name: Some(port_name),
            _connection: Some(connection),
        })
    }

    /// Name of the connected port, if any
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }
}
