// Output seams - Where the sequencer sends bytes and how tracks find a device

use crate::midi::event::MidiMessage;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Identifies one concrete MIDI output (a port name for midir outputs)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub String);

impl OutputId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// MIDI error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI init error: {0}")]
    Init(String),

    #[error("No MIDI port matching '{0}'")]
    PortNotFound(String),

    #[error("MIDI connection failed: {0}")]
    Connect(String),

    #[error("Unknown MIDI output: {0}")]
    UnknownOutput(OutputId),

    #[error("Failed to send to {output}: {reason}")]
    Send { output: OutputId, reason: String },
}

/// A device a track can play through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    pub output: OutputId,
    /// MIDI channel (0-15)
    pub channel: u8,
}

impl ResolvedDevice {
    pub fn new(output: OutputId, channel: u8) -> Self {
        Self {
            output,
            channel: channel & 0x0F,
        }
    }
}

/// Accepts raw MIDI messages for a given output
pub trait OutputSink: Send {
    fn send(&mut self, output: &OutputId, bytes: &[u8]) -> Result<(), MidiError>;
}

/// Maps logical device ids to concrete outputs
pub trait DeviceResolver: Send {
    /// Resolve a configured device id
    fn resolve(&self, device_id: &str) -> Option<ResolvedDevice>;

    /// Fallback device when neither track nor engine names one
    fn system_default(&self) -> Option<ResolvedDevice>;
}

/// Fixed device table
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    devices: HashMap<String, ResolvedDevice>,
    system_default: Option<ResolvedDevice>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, id: impl Into<String>, output: OutputId, channel: u8) -> Self {
        self.insert(id, ResolvedDevice::new(output, channel));
        self
    }

    pub fn with_system_default(mut self, output: OutputId, channel: u8) -> Self {
        self.system_default = Some(ResolvedDevice::new(output, channel));
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, device: ResolvedDevice) {
        self.devices.insert(id.into(), device);
    }

    pub fn set_system_default(&mut self, device: Option<ResolvedDevice>) {
        self.system_default = device;
    }
}

impl DeviceResolver for StaticResolver {
    fn resolve(&self, device_id: &str) -> Option<ResolvedDevice> {
        self.devices.get(device_id).cloned()
    }

    fn system_default(&self) -> Option<ResolvedDevice> {
        self.system_default.clone()
    }
}

/// One message captured by a `MemorySink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub output: OutputId,
    pub bytes: Vec<u8>,
}

impl SentMessage {
    pub fn message(&self) -> Option<MidiMessage> {
        MidiMessage::from_bytes(&self.bytes)
    }
}

/// Shared view of everything a `MemorySink` has accepted
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    inner: Arc<Mutex<Vec<SentMessage>>>,
}

impl MessageLog {
    fn push(&self, message: SentMessage) {
        if let Ok(mut log) = self.inner.lock() {
            log.push(message);
        }
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.inner.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Decoded messages in send order, unparseable entries skipped
    pub fn decoded(&self) -> Vec<MidiMessage> {
        self.messages().iter().filter_map(SentMessage::message).collect()
    }

    /// Take and clear the captured messages
    pub fn drain(&self) -> Vec<SentMessage> {
        self.inner
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sink that records messages instead of sending them
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: MessageLog,
    failing: HashSet<OutputId>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for inspecting captured messages after the sink is moved away
    pub fn log(&self) -> MessageLog {
        self.log.clone()
    }

    /// Make every send to `output` fail
    pub fn fail_output(mut self, output: OutputId) -> Self {
        self.failing.insert(output);
        self
    }
}

impl OutputSink for MemorySink {
    fn send(&mut self, output: &OutputId, bytes: &[u8]) -> Result<(), MidiError> {
        if self.failing.contains(output) {
            return Err(MidiError::Send {
                output: output.clone(),
                reason: "output marked as failing".to_string(),
            });
        }
        self.log.push(SentMessage {
            output: output.clone(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver() {
        let resolver = StaticResolver::new()
            .with_device("bass", OutputId::new("Port A"), 1)
            .with_system_default(OutputId::new("Port B"), 0);

        assert_eq!(
            resolver.resolve("bass"),
            Some(ResolvedDevice::new(OutputId::new("Port A"), 1))
        );
        assert_eq!(resolver.resolve("drums"), None);
        assert_eq!(resolver.system_default().unwrap().output.as_str(), "Port B");
    }

    #[test]
    fn test_channel_masked() {
        let device = ResolvedDevice::new(OutputId::new("x"), 17);
        assert_eq!(device.channel, 1);
    }

    #[test]
    fn test_memory_sink_records() {
        let mut sink = MemorySink::new();
        let log = sink.log();
        let out = OutputId::new("out");

        sink.send(&out, &[0xFA]).unwrap();
        sink.send(&out, &[0x90, 60, 100]).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.decoded()[0], MidiMessage::Start);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_memory_sink_failure() {
        let out = OutputId::new("broken");
        let mut sink = MemorySink::new().fail_output(out.clone());
        let log = sink.log();

        let result = sink.send(&out, &[0xFC]);
        assert!(matches!(result, Err(MidiError::Send { .. })));
        assert!(log.is_empty());
    }
}
