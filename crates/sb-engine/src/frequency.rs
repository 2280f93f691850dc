//! Note-name to frequency conversion.
//!
//! Lanes carry note names like `G#3`; playback needs Hz. Tuning is 12-TET
//! anchored at A4 = 440 Hz. Anything that does not parse plays at the
//! reference pitch instead of failing.

use sb_ir::LaneMap;

/// Frequency of A4, and the fallback for unparsable names.
pub const REFERENCE_HZ: f32 = 440.0;

/// Semitone distance of each natural note from A in the same octave.
fn letter_offset(letter: u8) -> Option<i32> {
    match letter {
        b'C' => Some(-9),
        b'D' => Some(-7),
        b'E' => Some(-5),
        b'F' => Some(-4),
        b'G' => Some(-2),
        b'A' => Some(0),
        b'B' => Some(2),
        _ => None,
    }
}

/// Signed semitone offset of a note name from A4.
///
/// Accepts `<LETTER>[#|b]<octave>`, e.g. `C4`, `Bb3`, `F#-1`.
pub fn semitone_offset(name: &str) -> Option<i32> {
    let bytes = name.trim().as_bytes();
    let (&letter, rest) = bytes.split_first()?;
    let mut semis = letter_offset(letter)?;

    let rest = match rest.first() {
        Some(b'#') => {
            semis += 1;
            &rest[1..]
        }
        Some(b'b') => {
            semis -= 1;
            &rest[1..]
        }
        _ => rest,
    };

    let octave: i32 = core::str::from_utf8(rest).ok()?.parse().ok()?;
    // Rejects "+4" and empty octaves; str::parse alone would accept a sign.
    if !rest.first().is_some_and(|c| c.is_ascii_digit() || *c == b'-') {
        return None;
    }
    semis.checked_add(octave.checked_sub(4)?.checked_mul(12)?)
}

/// Frequency of a note name in Hz, 440 Hz when the name does not parse.
pub fn note_frequency(name: &str) -> f32 {
    match semitone_offset(name) {
        Some(semis) => (REFERENCE_HZ as f64 * libm::pow(2.0, semis as f64 / 12.0)) as f32,
        None => REFERENCE_HZ,
    }
}

/// Frequency for a lane under the given map. Lanes clamp into range.
pub fn lane_frequency(lane: usize, map: &LaneMap) -> f32 {
    note_frequency(map.note(lane))
}
