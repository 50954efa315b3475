// Command line - Program arguments and the interactive console grammar
// Tracks and rows are 1-based on the console, 0-based in commands

use crate::messaging::command::Command;
use crate::sequencer::entry::{Entry, MAX_OCTAVE, PitchClass};
use crate::sequencer::pattern::{Pattern, TRACK_COUNT};
use crate::sequencer::transport::{SongPositionInterval, SyncSettings};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: live_sequencer [OPTIONS]

Options:
  --list              List MIDI ports and exit
  --config <PATH>     Configuration file (RON)
  --pattern <PATH>    Snapshot to load at start-up (RON or JSON)
  --save <PATH>       Write a snapshot on quit
  --demo              Start with a demo pattern
  -h, --help          Show this help";

pub const CONSOLE_HELP: &str = "\
  play | stop | cont | toggle
  bpm <20-300>
  mute <t> | unmute <t> | solo <t>
  vol <t> <0-127> | prog <t> <0-32> | dev <t> <id|->
  default <id|->
  note <row> <t> <C#4> [vol] | off <row> <t> | erase <row> <t> | clear
  ext on|off | spp on|off | spp-send on|off [interval] | startstop on|off
  quit";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliError {
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Option {0} needs a value")]
    MissingValue(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0}")]
    BadArgument(String),
}

/// Parsed program arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub list_ports: bool,
    pub help: bool,
    pub demo: bool,
    pub config_path: Option<PathBuf>,
    pub pattern_path: Option<PathBuf>,
    pub save_path: Option<PathBuf>,
}

impl CliOptions {
    /// Parse arguments, without the program name
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--list" | "-l" => options.list_ports = true,
                "--help" | "-h" => options.help = true,
                "--demo" => options.demo = true,
                "--config" | "-c" => {
                    options.config_path = Some(PathBuf::from(
                        args.next().ok_or(CliError::MissingValue(arg.clone()))?,
                    ));
                }
                "--pattern" | "-p" => {
                    options.pattern_path = Some(PathBuf::from(
                        args.next().ok_or(CliError::MissingValue(arg.clone()))?,
                    ));
                }
                "--save" => {
                    options.save_path = Some(PathBuf::from(
                        args.next().ok_or(CliError::MissingValue(arg.clone()))?,
                    ));
                }
                _ => return Err(CliError::UnknownOption(arg)),
            }
        }
        Ok(options)
    }
}

/// One console line, interpreted
#[derive(Debug, Clone)]
pub enum ConsoleInput {
    Command(Command),
    Help,
    Empty,
}

/// Console line parser
///
/// Keeps a mirror of the sync flags so single-flag commands can be sent
/// as a full `SetSync`.
#[derive(Debug, Clone, Default)]
pub struct Console {
    sync: SyncSettings,
}

impl Console {
    pub fn new(sync: SyncSettings) -> Self {
        Self { sync }
    }

    pub fn sync(&self) -> &SyncSettings {
        &self.sync
    }

    pub fn parse(&mut self, line: &str) -> Result<ConsoleInput, CliError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Ok(ConsoleInput::Empty);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "help" | "?" => return Ok(ConsoleInput::Help),
            "play" | "start" => Command::Start,
            "stop" => Command::Stop,
            "cont" | "continue" => Command::Continue,
            "toggle" | "t" => Command::TogglePlay,
            "quit" | "exit" | "q" => Command::Quit,
            "clear" => Command::ClearPattern,
            "bpm" => {
                let bpm = arg(args, 0, "bpm")?;
                Command::SetBpm(
                    bpm.parse()
                        .map_err(|_| CliError::BadArgument(format!("Invalid tempo: {}", bpm)))?,
                )
            }
            "mute" => Command::SetMute {
                track: track_arg(args, 0)?,
                muted: true,
            },
            "unmute" => Command::SetMute {
                track: track_arg(args, 0)?,
                muted: false,
            },
            "solo" => Command::ToggleSolo(track_arg(args, 0)?),
            "vol" => Command::SetTrackVolume {
                track: track_arg(args, 0)?,
                volume: number_arg(args, 1, "volume")?,
            },
            "prog" => Command::SetTrackProgram {
                track: track_arg(args, 0)?,
                program: number_arg(args, 1, "program")?,
            },
            "dev" => Command::SetTrackDevice {
                track: track_arg(args, 0)?,
                device: device_arg(arg(args, 1, "device")?),
            },
            "default" => Command::SetDefaultDevice(device_arg(arg(args, 0, "device")?)),
            "note" => {
                let mut entry = parse_note(arg(args, 2, "note")?)?;
                if args.len() > 3 {
                    entry = entry.with_volume(number_arg(args, 3, "volume")?);
                }
                Command::SetEntry {
                    row: row_arg(args, 0)?,
                    track: track_arg(args, 1)?,
                    entry,
                }
            }
            "off" => Command::SetEntry {
                row: row_arg(args, 0)?,
                track: track_arg(args, 1)?,
                entry: Entry::note_off(),
            },
            "erase" => Command::SetEntry {
                row: row_arg(args, 0)?,
                track: track_arg(args, 1)?,
                entry: Entry::default(),
            },
            "ext" => {
                self.sync.external_clock_slave = switch_arg(args, 0)?;
                Command::SetSync(self.sync)
            }
            "spp" => {
                self.sync.song_position_slave = switch_arg(args, 0)?;
                Command::SetSync(self.sync)
            }
            "spp-send" => {
                self.sync.send_song_position = switch_arg(args, 0)?;
                if args.len() > 1 {
                    let rows: u8 = number_arg(args, 1, "interval")?;
                    self.sync.song_position_interval = SongPositionInterval::from(rows);
                }
                Command::SetSync(self.sync)
            }
            "startstop" => {
                let enabled = switch_arg(args, 0)?;
                self.sync.send_start_stop = enabled;
                self.sync.receive_start_stop = enabled;
                Command::SetSync(self.sync)
            }
            _ => return Err(CliError::UnknownCommand(verb.to_string())),
        };
        Ok(ConsoleInput::Command(command))
    }
}

fn arg<'a>(args: &[&'a str], index: usize, name: &str) -> Result<&'a str, CliError> {
    args.get(index)
        .copied()
        .ok_or_else(|| CliError::BadArgument(format!("Missing {}", name)))
}

fn number_arg<N: std::str::FromStr>(
    args: &[&str],
    index: usize,
    name: &str,
) -> Result<N, CliError> {
    let value = arg(args, index, name)?;
    value
        .parse()
        .map_err(|_| CliError::BadArgument(format!("Invalid {}: {}", name, value)))
}

/// 1-based console index to a 0-based index below `limit`
fn index_arg(args: &[&str], index: usize, name: &str, limit: usize) -> Result<usize, CliError> {
    let value: usize = number_arg(args, index, name)?;
    if value == 0 || value > limit {
        return Err(CliError::BadArgument(format!(
            "{} must be between 1 and {}",
            name, limit
        )));
    }
    Ok(value - 1)
}

fn track_arg(args: &[&str], index: usize) -> Result<usize, CliError> {
    index_arg(args, index, "track", TRACK_COUNT)
}

// Rows past the pattern length are dropped by the pattern itself
fn row_arg(args: &[&str], index: usize) -> Result<usize, CliError> {
    index_arg(args, index, "row", usize::MAX)
}

fn device_arg(value: &str) -> Option<String> {
    (value != "-").then(|| value.to_string())
}

fn switch_arg(args: &[&str], index: usize) -> Result<bool, CliError> {
    match arg(args, index, "on/off")? {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        other => Err(CliError::BadArgument(format!("Expected on/off, got {}", other))),
    }
}

/// Parse a note name such as `C4`, `f#3` or `Bb2`
pub fn parse_note(text: &str) -> Result<Entry, CliError> {
    let invalid = || CliError::BadArgument(format!("Invalid note: {}", text));

    let mut chars = text.chars();
    let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
    let natural: i8 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(invalid()),
    };

    let rest = chars.as_str();
    let (shift, octave) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') if rest.len() > 1 => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: u8 = octave.parse().map_err(|_| invalid())?;

    // Cb and B# cross into the neighbouring octave
    let semitone = octave as i16 * 12 + (natural + shift) as i16;
    let octave = semitone.div_euclid(12);
    if !(0..=MAX_OCTAVE as i16).contains(&octave) {
        return Err(invalid());
    }
    let offset = semitone.rem_euclid(12) as u8;
    Ok(Entry::new(PitchClass::from_offset(offset), octave as u8))
}

/// A four-track groove to try the sequencer without editing
pub fn demo_pattern(rows: usize) -> Pattern {
    let mut pattern = Pattern::new("Demo", rows);

    pattern.fill_track(0, 4, Entry::new(PitchClass::C, 3));
    pattern.fill_track(2, 2, Entry::new(PitchClass::FSharp, 3).with_volume(70));

    let bass = [PitchClass::C, PitchClass::C, PitchClass::DSharp, PitchClass::G];
    for (i, row) in (0..pattern.rows()).step_by(8).enumerate() {
        pattern.set(row, 1, Entry::new(bass[i % bass.len()], 2).with_program(1));
        pattern.set(row + 6, 1, Entry::note_off());
    }

    let lead = [PitchClass::G, PitchClass::ASharp, PitchClass::C, PitchClass::DSharp];
    for (i, row) in (0..pattern.rows()).step_by(16).enumerate() {
        pattern.set(row + 2, 3, Entry::new(lead[i % lead.len()], 5).with_volume(100));
        pattern.set(row + 12, 3, Entry::note_off());
    }

    pattern
}
