// MIDI - Wire messages, output seams and midir-backed devices

pub mod device;
pub mod event;
pub mod input;
pub mod output;
pub mod sink;

pub use device::{MidiDeviceManager, MidiPortInfo};
pub use event::{MidiBytes, MidiMessage};
pub use input::MidiInput;
pub use output::MidiOutputPool;
pub use sink::{
    DeviceResolver, MemorySink, MessageLog, MidiError, OutputId, OutputSink, ResolvedDevice,
    SentMessage, StaticResolver,
};

/// Client name announced to the MIDI subsystem
pub const CLIENT_NAME: &str = "Live Sequencer";
