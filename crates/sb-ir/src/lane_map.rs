//! Lane-to-note-name table.

use arrayvec::ArrayString;

use crate::grid::LANES;

/// A stored note name such as `C#4`.
pub type NoteName = ArrayString<8>;

/// Default lane notes, low to high.
pub const DEFAULT_LANE_NOTES: [&str; LANES as usize] =
    ["G3", "G#3", "A3", "A#3", "B3", "C4", "C#4", "D4"];

/// Name substituted for blank entries.
const BLANK_NOTE: &str = "A4";

/// Errors from replacing the lane map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LaneMapError {
    #[error("lane map needs exactly {expected} notes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Ordered note names, one per lane.
///
/// Names are kept verbatim; parsing happens at playback so an unparsable
/// entry only affects its own lane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneMap {
    notes: [NoteName; LANES as usize],
}

impl Default for LaneMap {
    fn default() -> Self {
        Self::from_names(&DEFAULT_LANE_NOTES).unwrap_or(Self {
            notes: [NoteName::new(); LANES as usize],
        })
    }
}

impl LaneMap {
    /// Build a map from exactly `LANES` names.
    ///
    /// Blank entries become `A4`. A name too long to be a note is stored
    /// empty, which later resolves to the 440 Hz fallback.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, LaneMapError> {
        if names.len() != LANES as usize {
            return Err(LaneMapError::WrongLength {
                expected: LANES as usize,
                actual: names.len(),
            });
        }

        let mut notes = [NoteName::new(); LANES as usize];
        for (slot, name) in notes.iter_mut().zip(names) {
            let name = name.as_ref().trim();
            let name = if name.is_empty() { BLANK_NOTE } else { name };
            *slot = NoteName::from(name).unwrap_or_default();
        }
        Ok(Self { notes })
    }

    /// Note name for a lane. Out-of-range lanes clamp to the nearest edge.
    pub fn note(&self, lane: usize) -> &str {
        self.notes[lane.min(LANES as usize - 1)].as_str()
    }

    /// Iterate over the names, low lane first.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.notes.iter().map(|n| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_matches_staff() {
        let map = LaneMap::default();
        assert_eq!(map.note(0), "G3");
        assert_eq!(map.note(4), "B3");
        assert_eq!(map.note(7), "D4");
    }

    #[test]
    fn wrong_length_rejected() {
        let err = LaneMap::from_names(&["C4", "D4"]).unwrap_err();
        assert_eq!(err, LaneMapError::WrongLength { expected: 8, actual: 2 });

        let nine = ["A4"; 9];
        assert!(LaneMap::from_names(&nine).is_err());
    }

    #[test]
    fn blank_and_oversized_names() {
        let names = ["C4", " ", "E4", "F4", "G4", "A4", "B4", "not-a-note-at-all"];
        let map = LaneMap::from_names(&names).unwrap();
        assert_eq!(map.note(1), "A4");
        assert_eq!(map.note(7), "");
    }

    #[test]
    fn lane_clamps_high() {
        let map = LaneMap::default();
        assert_eq!(map.note(200), "D4");
        assert_eq!(map.iter().count(), 8);
    }
}
