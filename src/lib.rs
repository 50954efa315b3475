// Live Sequencer - Library exports for the binary, tests and benchmarks

pub mod cli;
pub mod config;
pub mod messaging;
pub mod midi;
pub mod project;
pub mod runtime;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use config::{ConfigError, DeviceConfig, SequencerConfig};
pub use messaging::channels::{create_command_channel, create_notification_channel};
pub use messaging::command::Command;
pub use midi::event::MidiMessage;
pub use midi::sink::{
    DeviceResolver, MemorySink, MidiError, OutputId, OutputSink, ResolvedDevice, StaticResolver,
};
pub use project::{ProjectError, SequencerSnapshot};
pub use runtime::EngineRunner;
pub use sequencer::{
    ClockState, Entry, ManualTimer, Pattern, PitchClass, SequencerEngine, SyncSettings,
    SystemTimer, Tempo, Timer,
};
