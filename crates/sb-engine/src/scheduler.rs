//! Tempo-driven playhead scheduling.
//!
//! The scheduler is a small state machine driven by a millisecond clock the
//! host passes in. Each call to [`Scheduler::advance`] releases whatever is
//! due: delayed combo strikes, and at most one tick of grid symbols. The
//! pending tick is an owned deadline, so pausing or stopping cancels it by
//! clearing the field.

use alloc::vec::Vec;

use sb_ir::{slot_of, Grid, LaneMap, SymbolKind, TOTAL_POSITIONS};

use crate::frequency::lane_frequency;
use crate::strike_queue::StrikeQueue;

/// Slowest tempo the scheduler will run at.
pub const MIN_BPM: f32 = 40.0;

/// Fastest tempo the scheduler will run at.
pub const MAX_BPM: f32 = 208.0;

/// Shortest note the synthesizer is asked for.
const MIN_NOTE_SECS: f32 = 0.05;

/// Nominal pitch tag of the downbeat accent.
pub const ACCENT_HZ: f32 = 1200.0;

/// Length of the downbeat accent.
pub const ACCENT_SECS: f32 = 0.06;

/// Clamp a tempo into the playable range. NaN runs at the slowest tempo.
pub fn clamp_bpm(bpm: f32) -> f32 {
    if bpm.is_nan() {
        MIN_BPM
    } else {
        bpm.clamp(MIN_BPM, MAX_BPM)
    }
}

/// Milliseconds between ticks: `round(60000 / clamp(bpm))`.
pub fn tick_interval_ms(bpm: f32) -> u64 {
    libm::round(60_000.0 / clamp_bpm(bpm) as f64) as u64
}

/// Convert a duration in beats to seconds at the given tempo, never below 50 ms.
pub fn beats_to_seconds(beats: f32, bpm: f32) -> f32 {
    let secs = beats * 60.0 / clamp_bpm(bpm);
    if secs.is_nan() {
        MIN_NOTE_SECS
    } else {
        secs.max(MIN_NOTE_SECS)
    }
}

/// Transport state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What caused a trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerSource {
    /// A grid symbol. `strike` counts from 0; combos produce strike 1 later.
    Note { lane: u8, kind: SymbolKind, strike: u8 },
    /// Downbeat click on an empty bar start.
    Accent,
}

/// A request to produce and dispatch one sound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trigger {
    pub source: TriggerSource,
    pub frequency: f32,
    /// Musical length in beats (0 for accents).
    pub beats: f32,
    /// Length in seconds at the tempo of the tick that produced it.
    pub seconds: f32,
}

/// Playhead state machine.
#[derive(Clone, Debug)]
pub struct Scheduler {
    state: TransportState,
    position: usize,
    next_tick_ms: Option<u64>,
    strikes: StrikeQueue,
    accent_downbeats: bool,
    ticks: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a stopped scheduler at position 0 with downbeat accents on.
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            position: 0,
            next_tick_ms: None,
            strikes: StrikeQueue::new(),
            accent_downbeats: true,
            ticks: 0,
        }
    }

    pub fn set_accent_downbeats(&mut self, enabled: bool) {
        self.accent_downbeats = enabled;
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Playhead position in `[0, TOTAL_POSITIONS)`.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of ticks executed since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Deadline of the armed tick, if any.
    pub fn next_tick_ms(&self) -> Option<u64> {
        self.next_tick_ms
    }

    /// Earliest time `advance` has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.next_tick_ms, self.strikes.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Delayed strikes that have not fired yet.
    pub fn pending_strikes(&self) -> &StrikeQueue {
        &self.strikes
    }

    /// Start or resume. The first tick is armed for `now_ms`.
    pub fn play(&mut self, now_ms: u64) {
        if self.state == TransportState::Playing {
            return;
        }
        self.state = TransportState::Playing;
        self.next_tick_ms = Some(now_ms);
    }

    /// Pause, keeping the playhead. Only meaningful while playing.
    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
            self.next_tick_ms = None;
        }
    }

    /// Stop and rewind to position 0.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position = 0;
        self.next_tick_ms = None;
    }

    /// Move the playhead. A pending tick keeps its deadline.
    pub fn seek(&mut self, pos: usize) {
        self.position = pos % TOTAL_POSITIONS;
    }

    /// Release everything due at `now_ms`.
    ///
    /// Returns delayed strikes first, then the tick's own triggers if the
    /// tick deadline has passed. A late host gets one tick, not a burst.
    pub fn advance(&mut self, now_ms: u64, grid: &Grid, lanes: &LaneMap, bpm: f32) -> Vec<Trigger> {
        let mut triggers = self.strikes.pop_due(now_ms);

        let tick_due = self.state == TransportState::Playing
            && self.next_tick_ms.is_some_and(|deadline| now_ms >= deadline);
        if tick_due {
            self.tick(now_ms, grid, lanes, bpm, &mut triggers);
        }
        triggers
    }

    fn tick(&mut self, now_ms: u64, grid: &Grid, lanes: &LaneMap, bpm: f32, out: &mut Vec<Trigger>) {
        let interval = tick_interval_ms(bpm);
        let (bar, subdivision) = slot_of(self.position);
        let symbols = grid.symbols_at(bar, subdivision).unwrap_or_default();

        for &(lane, kind) in &symbols {
            let Some(beats) = kind.beats() else { continue };
            let frequency = lane_frequency(lane as usize, lanes);
            let seconds = beats_to_seconds(beats, bpm);

            let strikes = kind.strikes();
            for strike in 0..strikes {
                let trigger = Trigger {
                    source: TriggerSource::Note { lane, kind, strike },
                    frequency,
                    beats,
                    seconds,
                };
                if strike == 0 {
                    out.push(trigger);
                } else {
                    let delay = interval * strike as u64 / strikes as u64;
                    self.strikes.push(now_ms + delay, trigger);
                }
            }
        }

        if self.accent_downbeats && subdivision == 0 && symbols.is_empty() {
            out.push(Trigger {
                source: TriggerSource::Accent,
                frequency: ACCENT_HZ,
                beats: 0.0,
                seconds: ACCENT_SECS,
            });
        }

        self.position = (self.position + 1) % TOTAL_POSITIONS;
        self.next_tick_ms = Some(now_ms + interval);
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_ir::{GridCoord, SUBDIVISIONS_PER_BAR};

    fn grid_with(entries: &[(u8, u8, u8, SymbolKind)]) -> Grid {
        let mut grid = Grid::new();
        for &(bar, sub, lane, kind) in entries {
            grid.place(GridCoord::new(bar, sub, lane).unwrap(), kind).unwrap();
        }
        grid
    }

    fn quiet() -> Scheduler {
        let mut s = Scheduler::new();
        s.set_accent_downbeats(false);
        s
    }

    #[test]
    fn interval_follows_clamped_tempo() {
        assert_eq!(tick_interval_ms(120.0), 500);
        assert_eq!(tick_interval_ms(60.0), 1000);
        assert_eq!(tick_interval_ms(240.0), (60_000.0f64 / 208.0).round() as u64);
        assert_eq!(tick_interval_ms(240.0), 288);
        assert_eq!(tick_interval_ms(10.0), 1500);
        assert_eq!(tick_interval_ms(f32::NAN), 1500);
    }

    #[test]
    fn beat_durations() {
        assert_eq!(beats_to_seconds(1.0, 60.0), 1.0);
        assert_eq!(beats_to_seconds(0.5, 120.0), 0.25);
        assert_eq!(beats_to_seconds(0.01, 208.0), 0.05);
        assert_eq!(beats_to_seconds(1.0, 1000.0), 60.0 / 208.0);
    }

    #[test]
    fn transport_transitions() {
        let mut s = Scheduler::new();
        assert_eq!(s.state(), TransportState::Stopped);

        s.pause();
        assert_eq!(s.state(), TransportState::Stopped);

        s.play(10);
        assert_eq!(s.state(), TransportState::Playing);
        assert_eq!(s.next_tick_ms(), Some(10));

        s.seek(7);
        s.pause();
        assert_eq!(s.state(), TransportState::Paused);
        assert_eq!(s.next_tick_ms(), None);
        assert_eq!(s.position(), 7);

        s.play(20);
        assert_eq!(s.next_tick_ms(), Some(20));
        s.stop();
        assert_eq!(s.state(), TransportState::Stopped);
        assert_eq!(s.position(), 0);
        assert_eq!(s.next_tick_ms(), None);
    }

    #[test]
    fn play_twice_keeps_deadline() {
        let mut s = Scheduler::new();
        s.play(0);
        s.play(400);
        assert_eq!(s.next_tick_ms(), Some(0));
    }

    #[test]
    fn seek_wraps_and_keeps_state() {
        let mut s = Scheduler::new();
        s.seek(TOTAL_POSITIONS + 3);
        assert_eq!(s.position(), 3);
        assert_eq!(s.state(), TransportState::Stopped);

        s.play(0);
        s.seek(9);
        assert_eq!(s.next_tick_ms(), Some(0));
        assert!(s.is_playing());
    }

    #[test]
    fn tick_waits_for_deadline_and_rearms() {
        let grid = Grid::new();
        let lanes = LaneMap::default();
        let mut s = quiet();

        assert!(s.advance(0, &grid, &lanes, 120.0).is_empty());
        assert_eq!(s.position(), 0);

        s.play(1000);
        s.advance(999, &grid, &lanes, 120.0);
        assert_eq!(s.position(), 0);

        s.advance(1000, &grid, &lanes, 120.0);
        assert_eq!(s.position(), 1);
        assert_eq!(s.next_tick_ms(), Some(1500));

        // Tempo change takes effect on the next re-arm.
        s.advance(1500, &grid, &lanes, 60.0);
        assert_eq!(s.next_tick_ms(), Some(2500));
    }

    #[test]
    fn late_host_gets_single_tick() {
        let grid = Grid::new();
        let lanes = LaneMap::default();
        let mut s = quiet();
        s.play(0);
        s.advance(0, &grid, &lanes, 120.0);
        s.advance(5000, &grid, &lanes, 120.0);
        assert_eq!(s.position(), 2);
        assert_eq!(s.next_tick_ms(), Some(5500));
    }

    #[test]
    fn pause_cancels_pending_tick() {
        let grid = Grid::new();
        let lanes = LaneMap::default();
        let mut s = quiet();
        s.play(0);
        s.advance(0, &grid, &lanes, 120.0);
        s.pause();
        s.advance(10_000, &grid, &lanes, 120.0);
        assert_eq!(s.position(), 1);
        assert_eq!(s.ticks(), 1);
    }

    #[test]
    fn rests_are_skipped_and_notes_resolved() {
        let grid = grid_with(&[
            (0, 0, 0, SymbolKind::Rest),
            (0, 0, 3, SymbolKind::Half),
            (0, 0, 7, SymbolKind::Full),
        ]);
        let lanes = LaneMap::default();
        let mut s = Scheduler::new();
        s.play(0);
        let triggers = s.advance(0, &grid, &lanes, 120.0);

        assert_eq!(triggers.len(), 2);
        assert_eq!(
            triggers[0].source,
            TriggerSource::Note { lane: 3, kind: SymbolKind::Half, strike: 0 }
        );
        assert_eq!(triggers[0].beats, 0.5);
        assert_eq!(triggers[0].seconds, 0.25);
        assert_eq!(triggers[1].beats, 1.0);
        assert_eq!(triggers[1].frequency, lane_frequency(7, &lanes));
    }

    #[test]
    fn combo_strikes_twice() {
        let grid = grid_with(&[(0, 1, 2, SymbolKind::Combo)]);
        let lanes = LaneMap::default();
        let mut s = quiet();
        s.seek(1);
        s.play(1000);

        let first = s.advance(1000, &grid, &lanes, 120.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].beats, 0.5);

        let pending: Vec<u64> = s.pending_strikes().iter().map(|(due, _)| due).collect();
        assert_eq!(pending, [1250]);
        assert_eq!(s.next_deadline(), Some(1250));

        assert!(s.advance(1249, &grid, &lanes, 120.0).is_empty());
        let second = s.advance(1250, &grid, &lanes, 120.0);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].beats, 0.5);
        assert_eq!(second[0].frequency, first[0].frequency);
        assert_eq!(
            second[0].source,
            TriggerSource::Note { lane: 2, kind: SymbolKind::Combo, strike: 1 }
        );
        assert_eq!(s.position(), 2);
    }

    #[test]
    fn combo_strike_survives_pause() {
        let grid = grid_with(&[(0, 0, 0, SymbolKind::Combo)]);
        let lanes = LaneMap::default();
        let mut s = quiet();
        s.play(0);
        s.advance(0, &grid, &lanes, 60.0);
        s.pause();
        assert_eq!(s.advance(500, &grid, &lanes, 60.0).len(), 1);
    }

    #[test]
    fn accent_on_empty_downbeats_only() {
        let grid = grid_with(&[(1, 0, 4, SymbolKind::Rest)]);
        let lanes = LaneMap::default();
        let mut s = Scheduler::new();
        s.play(0);

        let mut now = 0;
        let mut accents = Vec::new();
        for pos in 0..(3 * SUBDIVISIONS_PER_BAR as usize) {
            let triggers = s.advance(now, &grid, &lanes, 120.0);
            if triggers.iter().any(|t| t.source == TriggerSource::Accent) {
                accents.push(pos);
            }
            now += 500;
        }
        // Bar 1 starts with a rest, which counts as occupied.
        assert_eq!(accents, [0, 8]);
    }

    #[test]
    fn first_tick_of_c4_full_note() {
        let grid = grid_with(&[(0, 0, 4, SymbolKind::Full)]);
        let lanes = LaneMap::from_names(&["G3", "A3", "B3", "C4", "C4", "D4", "E4", "F4"]).unwrap();
        let mut s = Scheduler::new();
        s.play(0);

        let triggers = s.advance(0, &grid, &lanes, 60.0);
        assert_eq!(triggers.len(), 1);
        assert!((triggers[0].frequency - 261.63).abs() < 0.01);
        assert_eq!(triggers[0].seconds, 1.0);
        assert_eq!(s.position(), 1);
    }

    #[test]
    fn playhead_wraps_at_end() {
        let grid = Grid::new();
        let lanes = LaneMap::default();
        let mut s = quiet();
        s.seek(TOTAL_POSITIONS - 1);
        s.play(0);
        s.advance(0, &grid, &lanes, 120.0);
        assert_eq!(s.position(), 0);
    }
}
