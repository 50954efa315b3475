// MIDI messages - Wire encoding and decoding of the messages the sequencer uses

use std::ops::Deref;

pub mod status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const SONG_POSITION: u8 = 0xF2;
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
}

/// Largest song position pointer value (14 bits)
pub const MAX_SONG_POSITION: u16 = 0x3FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ProgramChange { channel: u8, program: u8 },
    TimingClock,
    Start,
    Continue,
    Stop,
    /// Position in sixteenth notes since the start of the song
    SongPosition { position: u16 },
}

/// Encoded message, at most three bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiBytes {
    buf: [u8; 3],
    len: usize,
}

impl MidiBytes {
    fn one(b0: u8) -> Self {
        Self {
            buf: [b0, 0, 0],
            len: 1,
        }
    }

    fn two(b0: u8, b1: u8) -> Self {
        Self {
            buf: [b0, b1, 0],
            len: 2,
        }
    }

    fn three(b0: u8, b1: u8, b2: u8) -> Self {
        Self {
            buf: [b0, b1, b2],
            len: 3,
        }
    }
}

impl Deref for MidiBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl MidiMessage {
    /// Parse a raw MIDI message
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let &status = bytes.first()?;
        let channel = status & 0x0F;

        match status {
            status::TIMING_CLOCK => return Some(MidiMessage::TimingClock),
            status::START => return Some(MidiMessage::Start),
            status::CONTINUE => return Some(MidiMessage::Continue),
            status::STOP => return Some(MidiMessage::Stop),
            status::SONG_POSITION => {
                if bytes.len() < 3 {
                    return None;
                }
                let lsb = (bytes[1] & 0x7F) as u16;
                let msb = (bytes[2] & 0x7F) as u16;
                return Some(MidiMessage::SongPosition {
                    position: (msb << 7) | lsb,
                });
            }
            _ => {}
        }

        match status & 0xF0 {
            status::NOTE_ON if bytes.len() >= 3 => {
                let note = bytes[1] & 0x7F;
                let velocity = bytes[2] & 0x7F;
                // Velocity 0 = Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff { channel, note })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            status::NOTE_OFF if bytes.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: bytes[1] & 0x7F,
            }),
            status::PROGRAM_CHANGE if bytes.len() >= 2 => Some(MidiMessage::ProgramChange {
                channel,
                program: bytes[1] & 0x7F,
            }),
            _ => None,
        }
    }

    /// Encode to wire bytes; channel and data bytes are masked into range
    pub fn to_bytes(&self) -> MidiBytes {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => MidiBytes::three(
                status::NOTE_ON | (channel & 0x0F),
                note & 0x7F,
                velocity & 0x7F,
            ),
            MidiMessage::NoteOff { channel, note } => {
                MidiBytes::three(status::NOTE_OFF | (channel & 0x0F), note & 0x7F, 0)
            }
            MidiMessage::ProgramChange { channel, program } => {
                MidiBytes::two(status::PROGRAM_CHANGE | (channel & 0x0F), program & 0x7F)
            }
            MidiMessage::TimingClock => MidiBytes::one(status::TIMING_CLOCK),
            MidiMessage::Start => MidiBytes::one(status::START),
            MidiMessage::Continue => MidiBytes::one(status::CONTINUE),
            MidiMessage::Stop => MidiBytes::one(status::STOP),
            MidiMessage::SongPosition { position } => MidiBytes::three(
                status::SONG_POSITION,
                (position & 0x7F) as u8,
                ((position >> 7) & 0x7F) as u8,
            ),
        }
    }

    /// Clock and transport messages (everything the engine reacts to from input)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MidiMessage::TimingClock
                | MidiMessage::Start
                | MidiMessage::Continue
                | MidiMessage::Stop
                | MidiMessage::SongPosition { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_bytes() {
        let msg = MidiMessage::NoteOn {
            channel: 2,
            note: 60,
            velocity: 100,
        };
        assert_eq!(&*msg.to_bytes(), &[0x92, 60, 100]);
    }

    #[test]
    fn test_note_off_bytes() {
        let msg = MidiMessage::NoteOff {
            channel: 15,
            note: 64,
        };
        assert_eq!(&*msg.to_bytes(), &[0x8F, 64, 0]);
    }

    #[test]
    fn test_program_change_bytes() {
        let msg = MidiMessage::ProgramChange {
            channel: 0,
            program: 4,
        };
        assert_eq!(&*msg.to_bytes(), &[0xC0, 4]);
    }

    #[test]
    fn test_realtime_bytes() {
        assert_eq!(&*MidiMessage::TimingClock.to_bytes(), &[0xF8]);
        assert_eq!(&*MidiMessage::Start.to_bytes(), &[0xFA]);
        assert_eq!(&*MidiMessage::Continue.to_bytes(), &[0xFB]);
        assert_eq!(&*MidiMessage::Stop.to_bytes(), &[0xFC]);
    }

    #[test]
    fn test_song_position_bytes() {
        let msg = MidiMessage::SongPosition { position: 300 };
        // 300 = 2 * 128 + 44
        assert_eq!(&*msg.to_bytes(), &[0xF2, 44, 2]);
        assert_eq!(MidiMessage::from_bytes(&[0xF2, 44, 2]), Some(msg));
    }

    #[test]
    fn test_song_position_max() {
        let msg = MidiMessage::SongPosition {
            position: MAX_SONG_POSITION,
        };
        assert_eq!(&*msg.to_bytes(), &[0xF2, 0x7F, 0x7F]);
    }

    #[test]
    fn test_parse_note_on_velocity_zero() {
        assert_eq!(
            MidiMessage::from_bytes(&[0x93, 64, 0]),
            Some(MidiMessage::NoteOff {
                channel: 3,
                note: 64
            })
        );
    }

    #[test]
    fn test_parse_realtime() {
        assert_eq!(MidiMessage::from_bytes(&[0xF8]), Some(MidiMessage::TimingClock));
        assert_eq!(MidiMessage::from_bytes(&[0xFA]), Some(MidiMessage::Start));
        assert_eq!(MidiMessage::from_bytes(&[0xFB]), Some(MidiMessage::Continue));
        assert_eq!(MidiMessage::from_bytes(&[0xFC]), Some(MidiMessage::Stop));
    }

    #[test]
    fn test_invalid_messages() {
        assert_eq!(MidiMessage::from_bytes(&[]), None);
        assert_eq!(MidiMessage::from_bytes(&[0x90, 60]), None);
        assert_eq!(MidiMessage::from_bytes(&[0xF2, 1]), None);
        assert_eq!(MidiMessage::from_bytes(&[0xB0, 7, 127]), None);
        assert_eq!(MidiMessage::from_bytes(&[0xFE]), None);
    }

    #[test]
    fn test_is_transport() {
        assert!(MidiMessage::TimingClock.is_transport());
        assert!(MidiMessage::SongPosition { position: 0 }.is_transport());
        assert!(
            !MidiMessage::NoteOff {
                channel: 0,
                note: 1
            }
            .is_transport()
        );
    }
}
