use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use live_sequencer::midi::{MemorySink, MidiMessage, OutputId, StaticResolver};
use live_sequencer::sequencer::{
    Entry, ManualTimer, Pattern, PitchClass, SequencerEngine, SyncSettings, TrackBank,
};
use live_sequencer::sequencer::dispatcher::{RowDispatcher, Routing};

fn busy_pattern(rows: usize) -> Pattern {
    let mut pattern = Pattern::new("bench", rows);
    for row in 0..rows {
        for track in 0..4 {
            let entry = if row % 7 == 6 {
                Entry::note_off()
            } else {
                Entry::new(PitchClass::from_offset((row + track) as u8), 3 + track as u8)
                    .with_program((row % 4) as u8)
            };
            pattern.set(row, track, entry);
        }
    }
    pattern
}

fn resolver() -> StaticResolver {
    StaticResolver::new()
        .with_device("a", OutputId::new("port-a"), 0)
        .with_device("b", OutputId::new("port-b"), 1)
        .with_system_default(OutputId::new("port-a"), 0)
}

/// Benchmark one row dispatch (runs on every tick)
fn bench_row_dispatch(c: &mut Criterion) {
    let pattern = busy_pattern(64);
    let tracks = TrackBank::new();
    let resolver = resolver();

    c.bench_function("dispatch_row", |b| {
        let mut dispatcher = RowDispatcher::new();
        let mut row = 0;
        b.iter(|| {
            let mut sink = MemorySink::new();
            let mut routing = Routing {
                resolver: &resolver,
                sink: &mut sink,
                default_device: Some("b"),
            };
            let report = dispatcher.dispatch(pattern.row(row), &tracks, &mut routing);
            row = (row + 1) % pattern.rows();
            black_box(report)
        });
    });
}

/// Benchmark full pattern loops through the engine
fn bench_engine_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_loop");

    for rows in [16usize, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                let mut engine =
                    SequencerEngine::new(ManualTimer::new(), resolver(), MemorySink::new())
                        .with_pattern(busy_pattern(rows));
                engine.set_sync_settings(SyncSettings {
                    send_song_position: true,
                    ..SyncSettings::default()
                });
                engine.start();
                for _ in 0..rows {
                    if let Some(handle) = engine.timer_mut().advance_to_next() {
                        engine.on_timer(handle);
                    }
                }
                engine.stop();
                black_box(engine.current_row())
            });
        });
    }
    group.finish();
}

/// Benchmark external clock handling (24 messages per beat)
fn bench_clock_pulses(c: &mut Criterion) {
    c.bench_function("clock_pulses_one_loop", |b| {
        b.iter(|| {
            let mut engine = SequencerEngine::new(ManualTimer::new(), resolver(), MemorySink::new())
                .with_pattern(busy_pattern(64));
            engine.set_external_clock_slave(true);
            engine.start();
            for _ in 0..64 * 12 {
                engine.handle_midi_bytes(black_box(&[0xF8u8][..]));
            }
            engine.stop();
            black_box(engine.current_row())
        });
    });
}

/// Benchmark the wire codec
fn bench_midi_codec(c: &mut Criterion) {
    let messages = [
        MidiMessage::NoteOn {
            channel: 3,
            note: 60,
            velocity: 100,
        },
        MidiMessage::ProgramChange {
            channel: 0,
            program: 12,
        },
        MidiMessage::SongPosition { position: 1234 },
        MidiMessage::TimingClock,
    ];

    c.bench_function("midi_encode_decode", |b| {
        b.iter(|| {
            for message in &messages {
                let bytes = message.to_bytes();
                black_box(MidiMessage::from_bytes(&bytes));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_row_dispatch,
    bench_engine_loop,
    bench_clock_pulses,
    bench_midi_codec
);
criterion_main!(benches);
