// Engine runner - Owns the engine on one thread, drains commands, fires ticks

use crate::messaging::channels::CommandConsumer;
use crate::messaging::command::Command;
use crate::sequencer::engine::SequencerEngine;
use crate::sequencer::timer::Timer;
use std::ops::ControlFlow;
use std::time::Duration;

/// Longest sleep between polls, keeps commands responsive
pub const MAX_IDLE: Duration = Duration::from_millis(1);

pub struct EngineRunner<T: Timer> {
    engine: SequencerEngine<T>,
    inputs: Vec<CommandConsumer>,
}

impl<T: Timer> EngineRunner<T> {
    pub fn new(engine: SequencerEngine<T>) -> Self {
        Self {
            engine,
            inputs: Vec::new(),
        }
    }

    /// Add a command source (UI, MIDI input, ...)
    pub fn with_input(mut self, rx: CommandConsumer) -> Self {
        self.inputs.push(rx);
        self
    }

    pub fn engine(&self) -> &SequencerEngine<T> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SequencerEngine<T> {
        &mut self.engine
    }

    pub fn into_engine(self) -> SequencerEngine<T> {
        self.engine
    }

    /// Apply one command to the engine
    pub fn apply(&mut self, cmd: Command) -> ControlFlow<()> {
        let engine = &mut self.engine;
        match cmd {
            Command::Midi(message) => engine.handle_midi(message),
            Command::Start => engine.start(),
            Command::Stop => engine.stop(),
            Command::Continue => engine.continue_playback(),
            Command::TogglePlay => engine.toggle_play(),
            Command::SetBpm(bpm) => engine.set_bpm(bpm),
            Command::SetEntry { row, track, entry } => engine.set_entry(row, track, entry),
            Command::ClearPattern => engine.clear_pattern(),
            Command::LoadPattern(pattern) => engine.load_pattern(*pattern),
            Command::SetMute { track, muted } => engine.set_mute(track, muted),
            Command::ToggleMute(track) => engine.toggle_mute(track),
            Command::ToggleSolo(track) => engine.toggle_solo(track),
            Command::SetTrackVolume { track, volume } => engine.set_track_volume(track, volume),
            Command::SetTrackProgram { track, program } => {
                engine.set_track_program(track, program)
            }
            Command::SetTrackDevice { track, device } => engine.set_track_device(track, device),
            Command::SetDefaultDevice(device) => engine.set_default_device(device),
            Command::SetSync(settings) => engine.set_sync_settings(settings),
            Command::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Drain every input, then fire due ticks
    ///
    /// Commands land between dispatch passes, never inside one.
    pub fn poll(&mut self) -> ControlFlow<()> {
        let mut flow = ControlFlow::Continue(());
        let mut pending = Vec::new();
        for rx in &mut self.inputs {
            while let Some(cmd) = ringbuf::traits::Consumer::try_pop(rx) {
                pending.push(cmd);
            }
        }
        for cmd in pending {
            if self.apply(cmd).is_break() {
                flow = ControlFlow::Break(());
                break;
            }
        }
        if flow.is_continue() {
            self.engine.fire_due();
        }
        flow
    }

    /// How long the loop may sleep before the next tick or command check
    pub fn idle_time(&self) -> Duration {
        let timer = self.engine.timer();
        match timer.next_deadline() {
            Some(at) => at.saturating_sub(timer.now()).min(MAX_IDLE),
            None => MAX_IDLE,
        }
    }

    /// Run until a Quit command arrives, then hand the engine back
    pub fn run(mut self) -> SequencerEngine<T> {
        tracing::debug!("Engine runner started");
        while self.poll().is_continue() {
            let idle = self.idle_time();
            if !idle.is_zero() {
                std::thread::sleep(idle);
            }
        }
        self.engine.stop();
        tracing::debug!("Engine runner stopped");
        self.engine
    }
}
