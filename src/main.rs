use live_sequencer::cli::{CONSOLE_HELP, CliOptions, Console, ConsoleInput, USAGE, demo_pattern};
use live_sequencer::config::SequencerConfig;
use live_sequencer::messaging::{
    Command, NotificationConsumer, NotificationLevel, create_command_channel,
    create_notification_channel, push_until,
};
use live_sequencer::midi::{MidiDeviceManager, MidiInput, MidiOutputPool};
use live_sequencer::project::{apply_snapshot, engine_snapshot, load_snapshot, save_snapshot};
use live_sequencer::runtime::EngineRunner;
use live_sequencer::sequencer::{Pattern, SequencerEngine, SystemTimer};
use ringbuf::traits::{Consumer, Producer};
use std::io::BufRead;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Ringbuffer capacity constants
// MIDI clock runs at 24 ppqn, ~120 messages/s at 300 BPM; 512 covers
// several seconds of a stalled engine thread
const MIDI_RINGBUFFER_CAPACITY: usize = 512;
const UI_RINGBUFFER_CAPACITY: usize = 64;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn list_ports() {
    let devices = MidiDeviceManager::new();
    println!("MIDI outputs:");
    for port in devices.list_output_ports() {
        let marker = if port.is_default { " (default)" } else { "" };
        println!("  [{}] {}{}", port.index, port.name, marker);
    }
    println!("MIDI inputs:");
    for port in devices.list_input_ports() {
        println!("  [{}] {}", port.index, port.name);
    }
}

fn drain_notifications(rx: &mut NotificationConsumer) {
    while let Some(notification) = rx.try_pop() {
        match notification.level {
            NotificationLevel::Info => tracing::info!("{}", notification.message),
            NotificationLevel::Warning => tracing::warn!("{}", notification.message),
            NotificationLevel::Error => tracing::error!("{}", notification.message),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = CliOptions::parse(std::env::args().skip(1))?;
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }
    if options.list_ports {
        list_ports();
        return Ok(());
    }

    let config = match &options.config_path {
        Some(path) => SequencerConfig::load(path)?,
        None => SequencerConfig::load_default()?,
    };
    init_logging(&config.log_filter);
    tracing::info!("Starting Live Sequencer");

    let (pool, resolver) = MidiOutputPool::open(&config.devices)?;
    config.check_devices(&resolver);

    let mut engine = SequencerEngine::new(SystemTimer::new(), resolver, pool)
        .with_pattern(Pattern::new("Pattern 1", config.rows));
    config.apply_to(&mut engine);

    if let Some(path) = &options.pattern_path {
        let snapshot = load_snapshot(path)?;
        apply_snapshot(&mut engine, &snapshot);
        tracing::info!(path = %path.display(), "Snapshot loaded");
    } else if options.demo {
        engine.load_pattern(demo_pattern(config.rows));
    }

    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    engine.set_notification_channel(notification_tx);

    let (mut command_tx_ui, command_rx_ui) = create_command_channel(UI_RINGBUFFER_CAPACITY);
    let (command_tx_midi, command_rx_midi) = create_command_channel(MIDI_RINGBUFFER_CAPACITY);

    // Keep the connection alive for the whole session
    let _midi_input = match MidiInput::new(command_tx_midi, config.input_port.as_deref()) {
        Ok(input) => {
            if let Some(port) = input.port_name() {
                println!("Sync input: {}", port);
            }
            Some(input)
        }
        Err(e) => {
            tracing::warn!("MIDI input unavailable: {}", e);
            None
        }
    };

    let mut console = Console::new(*engine.sync());
    let runner = EngineRunner::new(engine)
        .with_input(command_rx_ui)
        .with_input(command_rx_midi);
    let engine_thread = std::thread::Builder::new()
        .name("sequencer".to_string())
        .spawn(move || runner.run())?;

    println!("Type 'help' for commands");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        drain_notifications(&mut notification_rx);

        let command = match console.parse(&line) {
            Ok(ConsoleInput::Command(command)) => command,
            Ok(ConsoleInput::Help) => {
                println!("{}", CONSOLE_HELP);
                continue;
            }
            Ok(ConsoleInput::Empty) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if matches!(command, Command::Quit) {
            break;
        }
        if command_tx_ui.try_push(command).is_err() {
            tracing::warn!("Command buffer full, command ignored");
        }
    }

    // Quit must get through even when the buffer is full, or join never returns
    if push_until(&mut command_tx_ui, Command::Quit, || engine_thread.is_finished()).is_err() {
        tracing::error!("Sequencer thread exited before quit");
    }

    let engine = engine_thread
        .join()
        .map_err(|_| "Sequencer thread panicked")?;
    drain_notifications(&mut notification_rx);

    if let Some(path) = &options.save_path {
        save_snapshot(&engine_snapshot(&engine), path)?;
        tracing::info!(path = %path.display(), "Snapshot saved");
    }

    Ok(())
}
