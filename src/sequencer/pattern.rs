// Pattern - Fixed grid of entries addressed by (row, track)
// Owns no timing state; the engine reads it one row at a time

use crate::sequencer::entry::Entry;

/// Number of note lanes in every pattern
pub const TRACK_COUNT: usize = 4;

/// Default pattern length in rows
pub const DEFAULT_ROWS: usize = 64;

/// Longest pattern that can be constructed
pub const MAX_ROWS: usize = 256;

/// A pattern of step entries
///
/// The grid dimensions are fixed at construction. Every accessor is
/// bounds-checked: reads outside the grid return an empty entry and writes
/// outside the grid are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    name: String,
    rows: usize,
    /// Row-major cells, `rows * TRACK_COUNT` long
    cells: Vec<Entry>,
}

impl Pattern {
    /// Create an empty pattern, row count clamped to 1..=MAX_ROWS
    pub fn new(name: impl Into<String>, rows: usize) -> Self {
        let rows = rows.clamp(1, MAX_ROWS);
        Self {
            name: name.into(),
            rows,
            cells: vec![Entry::default(); rows * TRACK_COUNT],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tracks(&self) -> usize {
        TRACK_COUNT
    }

    fn index(&self, row: usize, track: usize) -> Option<usize> {
        (row < self.rows && track < TRACK_COUNT).then(|| row * TRACK_COUNT + track)
    }

    /// Entry at (row, track), empty when out of bounds
    pub fn get(&self, row: usize, track: usize) -> Entry {
        self.index(row, track)
            .map(|i| self.cells[i])
            .unwrap_or_default()
    }

    /// Store an entry; out-of-bounds writes are ignored
    pub fn set(&mut self, row: usize, track: usize, entry: Entry) {
        if let Some(i) = self.index(row, track) {
            self.cells[i] = entry;
        }
    }

    /// The entries of one row in track order, empty slice when out of bounds
    pub fn row(&self, row: usize) -> &[Entry] {
        if row < self.rows {
            &self.cells[row * TRACK_COUNT..(row + 1) * TRACK_COUNT]
        } else {
            &[]
        }
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.cells.fill(Entry::default());
    }

    /// Clear every row of one track
    pub fn clear_track(&mut self, track: usize) {
        for row in 0..self.rows {
            self.set(row, track, Entry::default());
        }
    }

    /// Write `entry` on every `step`-th row of a track, starting at row 0
    pub fn fill_track(&mut self, track: usize, step: usize, entry: Entry) {
        if step == 0 {
            return;
        }
        for row in (0..self.rows).step_by(step) {
            self.set(row, track, entry);
        }
    }

    /// True when no cell carries a note or a note-off marker
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|e| e.is_empty() && !e.is_note_off())
    }

    /// Number of cells with a note
    pub fn note_count(&self) -> usize {
        self.cells.iter().filter(|e| !e.is_empty()).count()
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new("Pattern 1", DEFAULT_ROWS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::entry::PitchClass;

    #[test]
    fn test_pattern_creation() {
        let pattern = Pattern::default();

        assert_eq!(pattern.name(), "Pattern 1");
        assert_eq!(pattern.rows(), 64);
        assert_eq!(pattern.tracks(), 4);
        assert!(pattern.is_empty());
    }

    #[test]
    fn test_row_count_clamped() {
        assert_eq!(Pattern::new("p", 0).rows(), 1);
        assert_eq!(Pattern::new("p", 10_000).rows(), MAX_ROWS);
    }

    #[test]
    fn test_set_and_get() {
        let mut pattern = Pattern::default();
        let entry = Entry::new(PitchClass::E, 3);

        pattern.set(10, 2, entry);

        assert_eq!(pattern.get(10, 2), entry);
        assert!(pattern.get(10, 1).is_empty());
        assert_eq!(pattern.note_count(), 1);
    }

    #[test]
    fn test_out_of_bounds_is_noop() {
        let mut pattern = Pattern::new("p", 16);
        let entry = Entry::new(PitchClass::C, 4);

        pattern.set(16, 0, entry);
        pattern.set(0, 4, entry);

        assert!(pattern.is_empty());
        assert!(pattern.get(100, 0).is_empty());
        assert!(pattern.get(0, 100).is_empty());
        assert!(pattern.row(16).is_empty());
    }

    #[test]
    fn test_row_slice() {
        let mut pattern = Pattern::new("p", 8);
        pattern.set(3, 0, Entry::new(PitchClass::C, 4));
        pattern.set(3, 3, Entry::note_off());

        let row = pattern.row(3);
        assert_eq!(row.len(), TRACK_COUNT);
        assert!(!row[0].is_empty());
        assert!(row[3].is_note_off());
    }

    #[test]
    fn test_clear_pattern() {
        let mut pattern = Pattern::default();
        pattern.set(0, 0, Entry::new(PitchClass::C, 4));
        pattern.set(5, 3, Entry::note_off());

        assert!(!pattern.is_empty());
        pattern.clear();
        assert!(pattern.is_empty());
        assert_eq!(pattern.rows(), 64);
    }

    #[test]
    fn test_fill_and_clear_track() {
        let mut pattern = Pattern::new("p", 16);
        pattern.fill_track(1, 4, Entry::new(PitchClass::A, 2));

        assert_eq!(pattern.note_count(), 4);
        assert!(!pattern.get(12, 1).is_empty());
        assert!(pattern.get(13, 1).is_empty());

        pattern.fill_track(1, 0, Entry::new(PitchClass::A, 2));
        assert_eq!(pattern.note_count(), 4);

        pattern.clear_track(1);
        assert!(pattern.is_empty());
    }
}
