// Row dispatcher - Turns a pattern row into MIDI events
// Tracks which note is sounding on each track so it can always be silenced

use crate::midi::event::MidiMessage;
use crate::midi::sink::{DeviceResolver, MidiError, OutputId, OutputSink, ResolvedDevice};
use crate::sequencer::entry::Entry;
use crate::sequencer::pattern::TRACK_COUNT;
use crate::sequencer::track::{TrackBank, TrackState};

/// A note-on that has not yet received its note-off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNote {
    pub note: u8,
    pub channel: u8,
    pub output: OutputId,
}

/// Outcome of dispatching one row
#[derive(Debug, Default, PartialEq)]
pub struct DispatchReport {
    pub notes_started: usize,
    pub notes_stopped: usize,
    /// Tracks skipped because no device could be resolved
    pub unresolved_tracks: Vec<usize>,
    pub send_errors: Vec<MidiError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved_tracks.is_empty() && self.send_errors.is_empty()
    }
}

/// Everything a dispatch pass routes through
pub struct Routing<'a> {
    pub resolver: &'a dyn DeviceResolver,
    pub sink: &'a mut dyn OutputSink,
    /// Engine-level default device id
    pub default_device: Option<&'a str>,
}

impl Routing<'_> {
    fn send(&mut self, output: &OutputId, message: MidiMessage) -> Result<(), MidiError> {
        self.sink.send(output, &message.to_bytes())
    }
}

/// Resolve the device a track plays through
///
/// Track binding first, then the engine default, then the system default.
/// A binding that fails to resolve falls through to the next step.
pub fn resolve_track(
    resolver: &dyn DeviceResolver,
    track: &TrackState,
    default_device: Option<&str>,
) -> Option<ResolvedDevice> {
    track
        .device
        .as_deref()
        .and_then(|id| resolver.resolve(id))
        .or_else(|| default_device.and_then(|id| resolver.resolve(id)))
        .or_else(|| resolver.system_default())
}

/// Distinct outputs reachable from any track, in track order
pub fn transport_outputs(
    resolver: &dyn DeviceResolver,
    tracks: &TrackBank,
    default_device: Option<&str>,
) -> Vec<OutputId> {
    let mut outputs: Vec<OutputId> = Vec::new();
    for track in tracks.iter() {
        if let Some(device) = resolve_track(resolver, track, default_device) {
            if !outputs.contains(&device.output) {
                outputs.push(device.output);
            }
        }
    }
    outputs
}

/// Velocity after applying the track volume: round(volume * track / 127)
pub fn effective_velocity(entry_volume: u8, track_volume: u8) -> u8 {
    let scaled = (entry_volume as f64 * track_volume as f64 / 127.0).round();
    scaled.clamp(0.0, 127.0) as u8
}

/// Row dispatcher with one active-note slot per track
#[derive(Debug, Default)]
pub struct RowDispatcher {
    active: [Option<ActiveNote>; TRACK_COUNT],
}

impl RowDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_note(&self, track: usize) -> Option<&ActiveNote> {
        self.active.get(track).and_then(Option::as_ref)
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| a.is_some()).count()
    }

    /// Dispatch one row of entries
    pub fn dispatch(
        &mut self,
        row: &[Entry],
        tracks: &TrackBank,
        routing: &mut Routing<'_>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (index, entry) in row.iter().enumerate().take(TRACK_COUNT) {
            let Some(track) = tracks.get(index) else {
                continue;
            };
            if track.muted {
                continue;
            }

            if entry.is_note_off() {
                self.release_into(index, routing, &mut report);
                continue;
            }

            let Some(note) = entry.midi_note() else {
                continue;
            };

            let velocity = effective_velocity(entry.volume, track.volume);
            if velocity == 0 {
                continue;
            }

            let Some(device) = resolve_track(routing.resolver, track, routing.default_device)
            else {
                tracing::warn!(track = index, "No MIDI device resolvable, row event skipped");
                report.unresolved_tracks.push(index);
                continue;
            };

            // One sounding note per track
            self.release_into(index, routing, &mut report);

            let program = if entry.program != 0 {
                entry.program
            } else {
                track.program
            };
            if program != 0 {
                let change = MidiMessage::ProgramChange {
                    channel: device.channel,
                    program: program - 1,
                };
                if let Err(e) = routing.send(&device.output, change) {
                    tracing::warn!(track = index, "Program change failed: {}", e);
                    report.send_errors.push(e);
                }
            }

            let note_on = MidiMessage::NoteOn {
                channel: device.channel,
                note,
                velocity,
            };
            match routing.send(&device.output, note_on) {
                Ok(()) => {
                    tracing::trace!(track = index, note, velocity, "note on");
                    self.active[index] = Some(ActiveNote {
                        note,
                        channel: device.channel,
                        output: device.output,
                    });
                    report.notes_started += 1;
                }
                Err(e) => {
                    tracing::warn!(track = index, "Note on failed: {}", e);
                    report.send_errors.push(e);
                }
            }
        }

        report
    }

    /// Force a note-off on one track
    pub fn release(&mut self, track: usize, routing: &mut Routing<'_>) -> DispatchReport {
        let mut report = DispatchReport::default();
        self.release_into(track, routing, &mut report);
        report
    }

    /// Force a note-off on every track with an active note
    pub fn release_all(&mut self, routing: &mut Routing<'_>) -> DispatchReport {
        let mut report = DispatchReport::default();
        for track in 0..TRACK_COUNT {
            self.release_into(track, routing, &mut report);
        }
        report
    }

    /// The table entry is retired even if the send fails
    fn release_into(
        &mut self,
        track: usize,
        routing: &mut Routing<'_>,
        report: &mut DispatchReport,
    ) {
        let Some(active) = self.active.get_mut(track).and_then(Option::take) else {
            return;
        };

        let note_off = MidiMessage::NoteOff {
            channel: active.channel,
            note: active.note,
        };
        match routing.send(&active.output, note_off) {
            Ok(()) => {
                tracing::trace!(track, note = active.note, "note off");
                report.notes_stopped += 1;
            }
            Err(e) => {
                tracing::warn!(track, "Note off failed: {}", e);
                report.send_errors.push(e);
            }
        }
    }
}
