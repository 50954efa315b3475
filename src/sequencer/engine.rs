// Sequencer engine - Owns the pattern, track states and clock
// Every entry point runs to completion; the tick slot holds the only pending timer

use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::event::MidiMessage;
use crate::midi::sink::{DeviceResolver, OutputSink};
use crate::sequencer::clock::{ClockState, PULSES_PER_ROW, Tempo, TickSlot};
use crate::sequencer::dispatcher::{
    ActiveNote, DispatchReport, RowDispatcher, Routing, transport_outputs,
};
use crate::sequencer::entry::Entry;
use crate::sequencer::pattern::Pattern;
use crate::sequencer::timer::{TickHandle, Timer};
use crate::sequencer::track::{TrackBank, TrackState};
use crate::sequencer::transport::{SyncSettings, TransportOrigin};
use ringbuf::traits::Producer;
use std::time::Duration;

/// Pattern sequencer driven by a timer or an external MIDI clock
///
/// The host owns the event loop. It forwards fired timer handles to
/// [`on_timer`](Self::on_timer) (or calls [`fire_due`](Self::fire_due)) and
/// incoming clock/transport messages to [`handle_midi`](Self::handle_midi).
pub struct SequencerEngine<T: Timer> {
    pattern: Pattern,
    tracks: TrackBank,
    tempo: Tempo,
    sync: SyncSettings,
    default_device: Option<String>,

    state: ClockState,
    row: usize,
    pulse_count: u32,
    /// Drift-free deadline of the next internal tick
    next_tick_at: Duration,
    tick: TickSlot,
    timer: T,

    dispatcher: RowDispatcher,
    resolver: Box<dyn DeviceResolver>,
    sink: Box<dyn OutputSink>,
    notifications: Option<NotificationProducer>,
}

impl<T: Timer> SequencerEngine<T> {
    /// Create a stopped engine with an empty default pattern
    pub fn new(
        timer: T,
        resolver: impl DeviceResolver + 'static,
        sink: impl OutputSink + 'static,
    ) -> Self {
        Self {
            pattern: Pattern::default(),
            tracks: TrackBank::new(),
            tempo: Tempo::default(),
            sync: SyncSettings::default(),
            default_device: None,
            state: ClockState::Stopped,
            row: 0,
            pulse_count: 0,
            next_tick_at: Duration::ZERO,
            tick: TickSlot::new(),
            timer,
            dispatcher: RowDispatcher::new(),
            resolver: Box::new(resolver),
            sink: Box::new(sink),
            notifications: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.load_pattern(pattern);
        self
    }

    /// Route routing/send failures to a notification channel
    pub fn set_notification_channel(&mut self, tx: NotificationProducer) {
        self.notifications = Some(tx);
    }

    // ---- Playback control ----

    /// Start from row 0 in the mode selected by the sync settings
    ///
    /// Starting while already playing in that mode does nothing.
    pub fn start(&mut self) {
        self.begin(Some(0), TransportOrigin::Local);
    }

    /// Start without resetting the row cursor
    pub fn continue_playback(&mut self) {
        self.begin(None, TransportOrigin::Local);
    }

    /// Stop playback, cancel the pending tick and silence every track
    pub fn stop(&mut self) {
        self.halt(TransportOrigin::Local);
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing() {
            self.stop();
        } else {
            self.start();
        }
    }

    fn target_state(&self) -> ClockState {
        if self.sync.external_clock_slave {
            ClockState::PlayingExternalClockSlave
        } else {
            ClockState::PlayingInternal
        }
    }

    fn begin(&mut self, from_row: Option<usize>, origin: TransportOrigin) {
        let target = self.target_state();
        if self.state == target {
            tracing::debug!("Already {}, start ignored", target);
            return;
        }
        if self.state.is_playing() {
            self.halt(origin);
        }

        let rows = self.pattern.rows();
        self.row = from_row.unwrap_or(self.row) % rows;
        self.pulse_count = 0;

        match target {
            ClockState::PlayingInternal => {
                self.next_tick_at = self.timer.now();
                self.tick.arm(&mut self.timer, Duration::ZERO);
            }
            _ => {
                self.tick.disarm(&mut self.timer);
            }
        }
        self.state = target;
        tracing::debug!(row = self.row, bpm = self.tempo.bpm(), "Transport {}", target);
        if origin == TransportOrigin::Remote {
            self.notify(Notification::info(
                NotificationCategory::Transport,
                format!("External master started playback at row {}", self.row + 1),
            ));
        }

        if origin == TransportOrigin::Local && self.sync.send_start_stop {
            let message = if from_row.is_some() {
                MidiMessage::Start
            } else {
                MidiMessage::Continue
            };
            self.send_transport(message);
        }
    }

    fn halt(&mut self, origin: TransportOrigin) {
        let was_playing = self.state.is_playing();
        self.tick.disarm(&mut self.timer);
        self.state = ClockState::Stopped;
        self.pulse_count = 0;
        self.release_all();

        if was_playing {
            tracing::debug!(row = self.row, "Transport stopped");
            match origin {
                TransportOrigin::Local if self.sync.send_start_stop => {
                    self.send_transport(MidiMessage::Stop);
                }
                TransportOrigin::Remote => {
                    self.notify(Notification::info(
                        NotificationCategory::Transport,
                        "External master stopped playback".to_string(),
                    ));
                }
                _ => {}
            }
        }
    }

    // ---- Clock sources ----

    /// Internal tick callback
    ///
    /// Handles that are not the slot's current occupant are stale and ignored.
    pub fn on_timer(&mut self, handle: TickHandle) {
        if self.state != ClockState::PlayingInternal || !self.tick.claim(handle) {
            tracing::trace!(handle = handle.id(), "Stale tick ignored");
            return;
        }

        self.play_current_row();
        self.advance_row();

        self.next_tick_at += self.tempo.row_duration();
        let delay = self.next_tick_at.saturating_sub(self.timer.now());
        self.tick.arm(&mut self.timer, delay);
    }

    /// Fire every due tick of the owned timer; returns how many fired
    pub fn fire_due(&mut self) -> usize {
        let due = self.timer.take_due();
        let fired = due.len();
        for handle in due {
            self.on_timer(handle);
        }
        fired
    }

    /// One incoming MIDI clock pulse (24 per quarter note)
    pub fn on_clock_pulse(&mut self) {
        if self.state != ClockState::PlayingExternalClockSlave {
            return;
        }
        if self.tick.disarm(&mut self.timer) {
            tracing::warn!("Internal tick pending under external clock, cancelled");
        }

        self.pulse_count += 1;
        if self.pulse_count >= PULSES_PER_ROW {
            self.pulse_count = 0;
            self.play_current_row();
            self.advance_row();
        }
    }

    /// Incoming song position pointer, in sixteenth notes
    pub fn on_song_position(&mut self, position: u16) {
        if !self.sync.song_position_slave || !self.state.is_playing() {
            return;
        }
        let row = position as usize % self.pattern.rows();
        if row != self.row {
            self.row = row;
            tracing::trace!(row, "Song position jump");
            self.dispatch_row(row);
        }
    }

    /// Route an incoming clock or transport message
    pub fn handle_midi(&mut self, message: MidiMessage) {
        match message {
            MidiMessage::TimingClock => self.on_clock_pulse(),
            MidiMessage::SongPosition { position } => self.on_song_position(position),
            MidiMessage::Start if self.sync.receive_start_stop => {
                self.begin(Some(0), TransportOrigin::Remote)
            }
            MidiMessage::Continue if self.sync.receive_start_stop => {
                self.begin(None, TransportOrigin::Remote)
            }
            MidiMessage::Stop if self.sync.receive_start_stop => {
                self.halt(TransportOrigin::Remote)
            }
            _ => {}
        }
    }

    pub fn handle_midi_bytes(&mut self, bytes: &[u8]) {
        if let Some(message) = MidiMessage::from_bytes(bytes) {
            self.handle_midi(message);
        }
    }

    // ---- Tempo and sync ----

    /// Set the tempo, clamped to [20, 300]
    ///
    /// Under the internal clock a change restarts playback.
    pub fn set_bpm(&mut self, bpm: f64) {
        let tempo = Tempo::new(bpm);
        if tempo == self.tempo {
            return;
        }
        self.tempo = tempo;
        tracing::debug!("Tempo set to {}", tempo);

        if self.state == ClockState::PlayingInternal {
            self.halt(TransportOrigin::Local);
            self.begin(Some(0), TransportOrigin::Local);
        }
    }

    /// Switch clock source; a change while playing stops and restarts
    pub fn set_external_clock_slave(&mut self, enabled: bool) {
        if self.sync.external_clock_slave == enabled {
            return;
        }
        let was_playing = self.state.is_playing();
        if was_playing {
            self.halt(TransportOrigin::Local);
        }
        self.sync.external_clock_slave = enabled;
        tracing::debug!(enabled, "External clock slave");
        if was_playing {
            self.begin(Some(0), TransportOrigin::Local);
        }
    }

    pub fn set_song_position_slave(&mut self, enabled: bool) {
        self.sync.song_position_slave = enabled;
    }

    /// Replace all sync flags, going through the clock-source switch
    pub fn set_sync_settings(&mut self, settings: SyncSettings) {
        self.sync = SyncSettings {
            external_clock_slave: self.sync.external_clock_slave,
            ..settings
        };
        self.set_external_clock_slave(settings.external_clock_slave);
    }

    // ---- Pattern editing ----

    pub fn entry(&self, row: usize, track: usize) -> Entry {
        self.pattern.get(row, track)
    }

    pub fn set_entry(&mut self, row: usize, track: usize, entry: Entry) {
        self.pattern.set(row, track, entry);
    }

    pub fn clear_pattern(&mut self) {
        self.pattern.clear();
    }

    /// Swap in a whole pattern; the row cursor wraps into the new length
    pub fn load_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
        self.row %= self.pattern.rows();
    }

    // ---- Tracks ----

    /// Set a track's mute flag; muting silences the track immediately
    pub fn set_mute(&mut self, track: usize, muted: bool) {
        if self.tracks.set_muted(track, muted) {
            self.release_track(track);
        }
    }

    pub fn toggle_mute(&mut self, track: usize) {
        let muted = self.tracks.is_muted(track);
        self.set_mute(track, !muted);
    }

    /// Solo a track, or unmute everything if it is already soloed
    pub fn toggle_solo(&mut self, track: usize) {
        for muted in self.tracks.toggle_solo(track) {
            self.release_track(muted);
        }
    }

    pub fn is_soloed(&self, track: usize) -> bool {
        self.tracks.is_soloed(track)
    }

    pub fn set_track_volume(&mut self, track: usize, volume: u8) {
        self.tracks.set_volume(track, volume);
    }

    pub fn set_track_program(&mut self, track: usize, program: u8) {
        self.tracks.set_program(track, program);
    }

    pub fn set_track_device(&mut self, track: usize, device: Option<String>) {
        self.tracks.set_device(track, device);
    }

    pub fn replace_track(&mut self, track: usize, state: TrackState) {
        let muting = state.muted && !self.tracks.is_muted(track);
        self.tracks.replace(track, state);
        if muting {
            self.release_track(track);
        }
    }

    pub fn set_default_device(&mut self, device: Option<String>) {
        self.default_device = device;
    }

    // ---- Accessors ----

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn current_row(&self) -> usize {
        self.row
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn bpm(&self) -> f64 {
        self.tempo.bpm()
    }

    pub fn ms_per_row(&self) -> f64 {
        self.tempo.ms_per_row()
    }

    pub fn sync(&self) -> &SyncSettings {
        &self.sync
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn tracks(&self) -> &TrackBank {
        &self.tracks
    }

    pub fn default_device(&self) -> Option<&str> {
        self.default_device.as_deref()
    }

    pub fn active_note(&self, track: usize) -> Option<&ActiveNote> {
        self.dispatcher.active_note(track)
    }

    pub fn active_note_count(&self) -> usize {
        self.dispatcher.active_count()
    }

    pub fn has_pending_tick(&self) -> bool {
        self.tick.is_armed()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    // ---- Dispatch plumbing ----

    fn advance_row(&mut self) {
        self.row = (self.row + 1) % self.pattern.rows();
    }

    fn play_current_row(&mut self) {
        let row = self.row;
        self.dispatch_row(row);
        if self.sync.position_due(row) {
            self.send_transport(MidiMessage::SongPosition {
                position: row as u16,
            });
        }
    }

    fn dispatch_row(&mut self, row: usize) {
        let mut routing = Routing {
            resolver: &*self.resolver,
            sink: &mut *self.sink,
            default_device: self.default_device.as_deref(),
        };
        let report = self
            .dispatcher
            .dispatch(self.pattern.row(row), &self.tracks, &mut routing);
        self.report(report);
    }

    fn release_track(&mut self, track: usize) {
        let mut routing = Routing {
            resolver: &*self.resolver,
            sink: &mut *self.sink,
            default_device: self.default_device.as_deref(),
        };
        let report = self.dispatcher.release(track, &mut routing);
        self.report(report);
    }

    fn release_all(&mut self) {
        let mut routing = Routing {
            resolver: &*self.resolver,
            sink: &mut *self.sink,
            default_device: self.default_device.as_deref(),
        };
        let report = self.dispatcher.release_all(&mut routing);
        self.report(report);
    }

    /// Send a transport message to every output the tracks reach
    fn send_transport(&mut self, message: MidiMessage) {
        let outputs = transport_outputs(
            &*self.resolver,
            &self.tracks,
            self.default_device.as_deref(),
        );
        if outputs.is_empty() {
            tracing::debug!(?message, "No output for transport message");
            return;
        }

        let bytes = message.to_bytes();
        for output in outputs {
            if let Err(e) = self.sink.send(&output, &bytes) {
                tracing::warn!("Transport message failed: {}", e);
                self.notify(Notification::error(NotificationCategory::Midi, e.to_string()));
            }
        }
    }

    fn report(&mut self, report: DispatchReport) {
        for track in report.unresolved_tracks {
            self.notify(Notification::warning(
                NotificationCategory::Routing,
                format!("Track {} has no resolvable MIDI device", track + 1),
            ));
        }
        for error in report.send_errors {
            self.notify(Notification::error(
                NotificationCategory::Midi,
                error.to_string(),
            ));
        }
    }

    fn notify(&mut self, notification: Notification) {
        if let Some(tx) = self.notifications.as_mut() {
            if tx.try_push(notification).is_err() {
                tracing::debug!("Notification buffer full, notification dropped");
            }
        }
    }
}

impl<T: Timer> Drop for SequencerEngine<T> {
    fn drop(&mut self) {
        self.tick.disarm(&mut self.timer);
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::create_notification_channel;
    use crate::messaging::notification::NotificationLevel;
    use crate::midi::sink::{MemorySink, MessageLog, OutputId, StaticResolver};
    use crate::sequencer::entry::PitchClass;
    use crate::sequencer::timer::ManualTimer;
    use ringbuf::traits::Consumer;

    fn engine() -> (SequencerEngine<ManualTimer>, MessageLog) {
        let sink = MemorySink::new();
        let log = sink.log();
        let resolver = StaticResolver::new().with_system_default(OutputId::new("out"), 0);
        (SequencerEngine::new(ManualTimer::new(), resolver, sink), log)
    }

    fn fire_next(engine: &mut SequencerEngine<ManualTimer>) {
        let handle = engine.timer_mut().advance_to_next().expect("tick pending");
        engine.on_timer(handle);
    }

    #[test]
    fn test_start_arms_single_tick() {
        let (mut engine, _log) = engine();
        engine.start();

        assert_eq!(engine.state(), ClockState::PlayingInternal);
        assert_eq!(engine.timer().pending_count(), 1);
        assert_eq!(engine.timer().next_deadline(), Some(Duration::ZERO));
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut engine, _log) = engine();
        engine.start();
        let pending = engine.timer().pending();
        engine.start();

        assert_eq!(engine.timer().pending(), pending);
    }

    #[test]
    fn test_tick_advances_and_reschedules() {
        let (mut engine, _log) = engine();
        engine.start();

        fire_next(&mut engine);
        assert_eq!(engine.current_row(), 1);
        assert_eq!(engine.timer().pending_count(), 1);
        assert_eq!(engine.timer().next_deadline(), Some(Duration::from_millis(125)));
    }

    #[test]
    fn test_late_tick_is_compensated() {
        let (mut engine, _log) = engine();
        engine.start();
        fire_next(&mut engine);

        // Fire the second tick 20ms late
        let handle = engine.timer_mut().advance_to_next().unwrap();
        engine.timer_mut().advance(Duration::from_millis(20));
        engine.on_timer(handle);

        // Next deadline stays on the 125ms grid
        assert_eq!(engine.timer().next_deadline(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_stale_handle_ignored() {
        let (mut engine, _log) = engine();
        engine.start();
        let stale = engine.timer().pending()[0];
        engine.stop();
        engine.start();

        engine.on_timer(stale);
        assert_eq!(engine.current_row(), 0);
        assert_eq!(engine.timer().pending_count(), 1);
    }

    #[test]
    fn test_stop_cancels_tick() {
        let (mut engine, _log) = engine();
        engine.start();
        engine.stop();

        assert_eq!(engine.state(), ClockState::Stopped);
        assert!(!engine.has_pending_tick());
        assert_eq!(engine.timer().pending_count(), 0);
    }

    #[test]
    fn test_mute_silences_track() {
        let (mut engine, log) = engine();
        engine.set_entry(0, 1, Entry::new(PitchClass::C, 5));
        engine.start();
        fire_next(&mut engine);
        assert!(engine.active_note(1).is_some());

        engine.set_mute(1, true);
        assert!(engine.active_note(1).is_none());
        assert_eq!(
            log.decoded().last(),
            Some(&MidiMessage::NoteOff {
                channel: 0,
                note: 60
            })
        );
    }

    #[test]
    fn test_toggle_solo_silences_others() {
        let (mut engine, _log) = engine();
        for track in 0..4 {
            engine.set_entry(0, track, Entry::new(PitchClass::C, 4));
        }
        engine.start();
        fire_next(&mut engine);
        assert_eq!(engine.active_note_count(), 4);

        engine.toggle_solo(2);
        assert!(engine.is_soloed(2));
        assert_eq!(engine.active_note_count(), 1);
        assert!(engine.active_note(2).is_some());

        engine.toggle_solo(2);
        assert!(!engine.tracks().is_muted(0));
        assert_eq!(engine.tracks().soloed_track(), None);
    }

    #[test]
    fn test_unresolved_device_notifies() {
        let sink = MemorySink::new();
        let mut engine = SequencerEngine::new(ManualTimer::new(), StaticResolver::new(), sink);
        let (tx, mut rx) = create_notification_channel(8);
        engine.set_notification_channel(tx);

        engine.set_entry(0, 0, Entry::new(PitchClass::C, 4));
        engine.start();
        fire_next(&mut engine);

        let notification = rx.try_pop().expect("notification");
        assert_eq!(notification.category, NotificationCategory::Routing);
        assert_eq!(engine.current_row(), 1);
    }

    #[test]
    fn test_remote_transport_notifies() {
        let (mut engine, _log) = engine();
        let (tx, mut rx) = create_notification_channel(8);
        engine.set_notification_channel(tx);
        engine.set_sync_settings(SyncSettings {
            receive_start_stop: true,
            ..SyncSettings::default()
        });

        // Local transport stays quiet
        engine.start();
        engine.stop();
        assert!(rx.try_pop().is_none());

        engine.handle_midi(MidiMessage::Start);
        let started = rx.try_pop().expect("start notification");
        assert_eq!(started.level, NotificationLevel::Info);
        assert_eq!(started.category, NotificationCategory::Transport);
        assert!(started.message.contains("row 1"));

        engine.handle_midi(MidiMessage::Stop);
        let stopped = rx.try_pop().expect("stop notification");
        assert_eq!(stopped.category, NotificationCategory::Transport);
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_load_pattern_wraps_cursor() {
        let (mut engine, _log) = engine();
        engine.start();
        for _ in 0..20 {
            fire_next(&mut engine);
        }
        assert_eq!(engine.current_row(), 20);

        engine.load_pattern(Pattern::new("short", 16));
        assert_eq!(engine.current_row(), 4);
    }

    #[test]
    fn test_continue_keeps_row() {
        let (mut engine, _log) = engine();
        engine.start();
        for _ in 0..5 {
            fire_next(&mut engine);
        }
        engine.stop();
        engine.continue_playback();

        assert_eq!(engine.current_row(), 5);
        assert!(engine.is_playing());
    }

    #[test]
    fn test_drop_flushes_notes() {
        let (mut engine, log) = engine();
        engine.set_entry(0, 0, Entry::new(PitchClass::D, 5));
        engine.start();
        fire_next(&mut engine);
        drop(engine);

        assert!(matches!(
            log.decoded().last(),
            Some(MidiMessage::NoteOff { note: 62, .. })
        ));
    }
}
