// Track state - Per-track mute, volume, program and device binding
// Independent of pattern content; solo is derived from the mute vector

use crate::sequencer::entry::MAX_PROGRAM;
use crate::sequencer::pattern::TRACK_COUNT;

/// Mixer-style state for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackState {
    pub muted: bool,
    /// Velocity scale (0-127, 127 = unity)
    pub volume: u8,
    /// Default program used when an entry has none (0 = none, 1-32)
    pub program: u8,
    /// Device id to route through, None = engine default device
    pub device: Option<String>,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            muted: false,
            volume: 127,
            program: 0,
            device: None,
        }
    }
}

/// A track is soloed iff it is unmuted while every other track is muted
pub fn is_soloed(mutes: &[bool], track: usize) -> bool {
    match mutes.get(track) {
        Some(false) => mutes.iter().filter(|m| **m).count() == mutes.len() - 1,
        _ => false,
    }
}

/// The four track states of an engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackBank {
    tracks: [TrackState; TRACK_COUNT],
}

impl TrackBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, track: usize) -> Option<&TrackState> {
        self.tracks.get(track)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackState> {
        self.tracks.iter()
    }

    pub fn mutes(&self) -> [bool; TRACK_COUNT] {
        std::array::from_fn(|i| self.tracks[i].muted)
    }

    pub fn is_muted(&self, track: usize) -> bool {
        self.tracks.get(track).is_some_and(|t| t.muted)
    }

    pub fn is_soloed(&self, track: usize) -> bool {
        is_soloed(&self.mutes(), track)
    }

    /// The currently soloed track, if any
    pub fn soloed_track(&self) -> Option<usize> {
        (0..TRACK_COUNT).find(|&t| self.is_soloed(t))
    }

    /// Set a track's mute flag
    ///
    /// Returns true when the track went from unmuted to muted, so the caller
    /// can silence it.
    pub fn set_muted(&mut self, track: usize, muted: bool) -> bool {
        match self.tracks.get_mut(track) {
            Some(state) => {
                let newly_muted = muted && !state.muted;
                state.muted = muted;
                newly_muted
            }
            None => false,
        }
    }

    /// Apply the solo toggle to the mute vector
    ///
    /// Soloed track: unmute everything. Otherwise unmute `track` and mute all
    /// others. Returns the tracks that became muted.
    pub fn toggle_solo(&mut self, track: usize) -> Vec<usize> {
        if track >= TRACK_COUNT {
            return Vec::new();
        }

        if self.is_soloed(track) {
            for state in &mut self.tracks {
                state.muted = false;
            }
            return Vec::new();
        }

        let mut newly_muted = Vec::new();
        for (i, state) in self.tracks.iter_mut().enumerate() {
            if i == track {
                state.muted = false;
            } else if !state.muted {
                state.muted = true;
                newly_muted.push(i);
            }
        }
        newly_muted
    }

    pub fn set_volume(&mut self, track: usize, volume: u8) {
        if let Some(state) = self.tracks.get_mut(track) {
            state.volume = volume.min(127);
        }
    }

    pub fn set_program(&mut self, track: usize, program: u8) {
        if let Some(state) = self.tracks.get_mut(track) {
            state.program = program.min(MAX_PROGRAM);
        }
    }

    pub fn set_device(&mut self, track: usize, device: Option<String>) {
        if let Some(state) = self.tracks.get_mut(track) {
            state.device = device;
        }
    }

    /// Replace one track's state wholesale (used when restoring a snapshot)
    pub fn replace(&mut self, track: usize, mut state: TrackState) {
        if let Some(slot) = self.tracks.get_mut(track) {
            state.volume = state.volume.min(127);
            state.program = state.program.min(MAX_PROGRAM);
            *slot = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solo_derivation() {
        assert!(is_soloed(&[true, true, false, true], 2));
        assert!(!is_soloed(&[true, true, false, true], 0));
        assert!(!is_soloed(&[false, true, false, true], 2));
        assert!(!is_soloed(&[false, false, false, false], 0));
        assert!(!is_soloed(&[true, true, true, true], 0));
        assert!(!is_soloed(&[true, true, false, true], 9));
    }

    #[test]
    fn test_muting_three_solos_the_fourth() {
        let mut bank = TrackBank::new();
        bank.set_muted(0, true);
        bank.set_muted(1, true);
        bank.set_muted(3, true);

        assert!(bank.is_soloed(2));
        assert_eq!(bank.soloed_track(), Some(2));

        bank.set_muted(1, false);
        assert_eq!(bank.soloed_track(), None);
    }

    #[test]
    fn test_toggle_solo() {
        let mut bank = TrackBank::new();
        bank.set_muted(1, true);

        let newly_muted = bank.toggle_solo(2);
        assert_eq!(newly_muted, vec![0, 3]);
        assert_eq!(bank.mutes(), [true, true, false, true]);
        assert!(bank.is_soloed(2));

        let newly_muted = bank.toggle_solo(2);
        assert!(newly_muted.is_empty());
        assert_eq!(bank.mutes(), [false; 4]);
    }

    #[test]
    fn test_toggle_solo_switches_track() {
        let mut bank = TrackBank::new();
        bank.toggle_solo(0);
        let newly_muted = bank.toggle_solo(3);

        assert_eq!(newly_muted, vec![0]);
        assert_eq!(bank.mutes(), [true, true, true, false]);
        assert_eq!(bank.soloed_track(), Some(3));
    }

    #[test]
    fn test_set_muted_reports_transition() {
        let mut bank = TrackBank::new();
        assert!(bank.set_muted(0, true));
        assert!(!bank.set_muted(0, true));
        assert!(!bank.set_muted(0, false));
        assert!(!bank.set_muted(7, true));
    }

    #[test]
    fn test_setters_clamp() {
        let mut bank = TrackBank::new();
        bank.set_volume(0, 200);
        bank.set_program(0, 99);
        bank.set_device(0, Some("synth".to_string()));

        let track = bank.get(0).unwrap();
        assert_eq!(track.volume, 127);
        assert_eq!(track.program, MAX_PROGRAM);
        assert_eq!(track.device.as_deref(), Some("synth"));
    }
}
